//! Per-frame field dispatch.
//!
//! Every frame the dispatcher runs the same fixed protocol against a
//! [`FieldBackend`]:
//!
//! 1. snapshot the sources (done by the caller, passed by value)
//! 2. allocate the source buffer
//! 3. finish pending rendering, then acquire the shared image
//! 4. upload the sources
//! 5. bind the kernel arguments
//! 6. launch one invocation per pixel
//! 7. release the image back to rendering
//!
//! Once the image is acquired every step runs even if an earlier one failed.
//! Failures never escape: they are gathered in a [`DispatchReport`] and
//! logged once at the end of the frame. The shared image is always released
//! before `dispatch` returns.

use crate::error::{DispatchError, InteropError};
use crate::params::FieldParams;
use crate::sources::SourcePoint;
use crate::texture::{FieldExtent, SharedField};

/// Arguments of one kernel launch, in ABI order.
#[derive(Debug)]
pub struct KernelArgs<'a, S, I> {
    pub sources: &'a S,
    pub count: u32,
    pub charge: f32,
    pub limit: f32,
    pub apply_limit: i32,
    pub output: &'a I,
}

/// Device operations the dispatch protocol is made of.
///
/// The GPU implementation lives in [`crate::gpu`]; tests substitute a
/// recording backend.
pub trait FieldBackend {
    /// Compute-side alias of the shared image.
    type Image;
    /// Device buffer holding the source points.
    type Sources;

    /// Allocate a read-only buffer for `count` points.
    fn allocate_sources(&mut self, count: usize) -> Result<Self::Sources, DispatchError>;

    /// Block until rendering work that may read the image has retired.
    fn finish_rendering(&mut self);

    /// Take the image for compute.
    fn acquire(&mut self, image: &Self::Image) -> Result<(), InteropError>;

    /// Upload the source points.
    fn write_sources(
        &mut self,
        buffer: &Self::Sources,
        points: &[SourcePoint],
    ) -> Result<(), DispatchError>;

    /// Bind `args` and launch the kernel over `extent`.
    fn launch(
        &mut self,
        args: KernelArgs<'_, Self::Sources, Self::Image>,
        extent: FieldExtent,
    ) -> Result<(), DispatchError>;

    /// Hand the image back to rendering.
    fn release(&mut self, image: &Self::Image) -> Result<(), DispatchError>;
}

/// Outcome of one frame's dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub frame: u64,
    /// Set when the image could not be acquired; compute was skipped.
    pub interop: Option<InteropError>,
    /// Every failed step, in order.
    pub errors: Vec<DispatchError>,
    /// Whether the kernel was launched successfully.
    pub launched: bool,
}

impl DispatchReport {
    fn new(frame: u64) -> Self {
        Self {
            frame,
            interop: None,
            errors: Vec::new(),
            launched: false,
        }
    }

    fn record(&mut self, result: Result<(), DispatchError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.errors.push(e);
                false
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.interop.is_none() && self.errors.is_empty()
    }
}

/// Runs the field kernel against the shared image once per frame.
pub struct FieldDispatcher<B: FieldBackend> {
    backend: B,
    field: SharedField<B::Image>,
    frame: u64,
}

impl<B: FieldBackend> FieldDispatcher<B> {
    pub fn new(backend: B, field: SharedField<B::Image>) -> Self {
        Self {
            backend,
            field,
            frame: 0,
        }
    }

    /// Compute the field for `sources` and `params` into the shared image.
    pub fn dispatch(&mut self, sources: Vec<SourcePoint>, params: &FieldParams) -> DispatchReport {
        self.frame += 1;
        let mut report = DispatchReport::new(self.frame);
        let count = sources.len();

        let buffer = match self.backend.allocate_sources(count) {
            Ok(buffer) => buffer,
            Err(e) => {
                report.errors.push(e);
                return finish(report);
            }
        };

        self.backend.finish_rendering();

        let lease = match self.field.acquire() {
            Ok(lease) => lease,
            Err(e) => {
                report.interop = Some(e);
                return finish(report);
            }
        };
        if let Err(e) = self.backend.acquire(lease.image()) {
            report.interop = Some(e);
            return finish(report);
        }
        tracing::trace!(frame = self.frame, count, "field image acquired");

        // Every step runs; failures are combined into the report
        report.record(self.backend.write_sources(&buffer, &sources));
        let args = KernelArgs {
            sources: &buffer,
            count: count as u32,
            charge: params.charge,
            limit: params.limit,
            apply_limit: params.apply_limit as i32,
            output: lease.image(),
        };
        report.launched = report.record(self.backend.launch(args, lease.extent()));

        report.record(self.backend.release(lease.image()));
        lease.release();
        tracing::trace!(frame = self.frame, "field image released");

        finish(report)
    }

    pub fn field(&self) -> &SharedField<B::Image> {
        &self.field
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Frames dispatched so far.
    pub fn frames(&self) -> u64 {
        self.frame
    }
}

fn finish(report: DispatchReport) -> DispatchReport {
    if !report.is_clean() {
        let errors: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        match &report.interop {
            Some(interop) => tracing::warn!(
                frame = report.frame,
                "field compute skipped: {}",
                interop
            ),
            None => tracing::warn!(
                frame = report.frame,
                "field dispatch reported {} error(s): {}",
                errors.len(),
                errors.join("; ")
            ),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        calls: Vec<&'static str>,
        fail_upload: bool,
    }

    impl FieldBackend for Counting {
        type Image = ();
        type Sources = usize;

        fn allocate_sources(&mut self, count: usize) -> Result<usize, DispatchError> {
            self.calls.push("allocate");
            Ok(count)
        }

        fn finish_rendering(&mut self) {
            self.calls.push("finish");
        }

        fn acquire(&mut self, _image: &()) -> Result<(), InteropError> {
            self.calls.push("acquire");
            Ok(())
        }

        fn write_sources(&mut self, _buffer: &usize, _points: &[SourcePoint]) -> Result<(), DispatchError> {
            self.calls.push("write");
            if self.fail_upload {
                Err(DispatchError::Upload("lost".into()))
            } else {
                Ok(())
            }
        }

        fn launch(&mut self, args: KernelArgs<'_, usize, ()>, _extent: FieldExtent) -> Result<(), DispatchError> {
            assert_eq!(*args.sources, args.count as usize);
            self.calls.push("launch");
            Ok(())
        }

        fn release(&mut self, _image: &()) -> Result<(), DispatchError> {
            self.calls.push("release");
            Ok(())
        }
    }

    #[test]
    fn test_protocol_order() {
        let field = SharedField::new((), FieldExtent::new(8, 8));
        let mut dispatcher = FieldDispatcher::new(Counting::default(), field);

        let report = dispatcher.dispatch(vec![SourcePoint::ZERO; 3], &FieldParams::default());

        assert!(report.is_clean());
        assert!(report.launched);
        assert_eq!(
            dispatcher.backend().calls,
            ["allocate", "finish", "acquire", "write", "launch", "release"]
        );
    }

    #[test]
    fn test_failed_upload_runs_remaining_steps() {
        let field = SharedField::new((), FieldExtent::new(8, 8));
        let backend = Counting {
            fail_upload: true,
            ..Default::default()
        };
        let mut dispatcher = FieldDispatcher::new(backend, field);

        let report = dispatcher.dispatch(vec![SourcePoint::ZERO], &FieldParams::default());

        assert!(report.launched);
        assert_eq!(report.errors, vec![DispatchError::Upload("lost".into())]);
        assert_eq!(
            dispatcher.backend().calls,
            ["allocate", "finish", "acquire", "write", "launch", "release"]
        );
        assert_eq!(dispatcher.field().state(), crate::texture::AccessState::Free);
    }
}
