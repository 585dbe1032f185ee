//! Benchmarks for the host side of a field frame.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use metafield::kernel::field_intensity;
use metafield::mapping::{remap_point, Rect};
use metafield::{
    DispatchError, FieldBackend, FieldDispatcher, FieldExtent, FieldParams, IVec2, InteropError,
    KernelArgs, SharedField, SourcePoint, SourceRegistry, Vec2,
};

/// Backend that accepts every operation and does no device work.
struct NullBackend;

impl FieldBackend for NullBackend {
    type Image = ();
    type Sources = usize;

    fn allocate_sources(&mut self, count: usize) -> Result<usize, DispatchError> {
        Ok(count)
    }

    fn finish_rendering(&mut self) {}

    fn acquire(&mut self, _image: &()) -> Result<(), InteropError> {
        Ok(())
    }

    fn write_sources(&mut self, _buffer: &usize, points: &[SourcePoint]) -> Result<(), DispatchError> {
        black_box(points);
        Ok(())
    }

    fn launch(&mut self, args: KernelArgs<'_, usize, ()>, _extent: FieldExtent) -> Result<(), DispatchError> {
        black_box(args.count);
        Ok(())
    }

    fn release(&mut self, _image: &()) -> Result<(), DispatchError> {
        Ok(())
    }
}

fn bench_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("initialize_grid");

    for stride in [100u32, 25, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(stride), &stride, |b, &stride| {
            let mut registry = SourceRegistry::new();
            b.iter(|| registry.initialize_grid(800, 600, black_box(stride)))
        });
    }

    group.finish();
}

fn bench_pointer(c: &mut Criterion) {
    let window = Rect::from_size(1600, 1200);
    let field = Rect::from_size(800, 600);

    c.bench_function("remap_point", |b| {
        b.iter(|| remap_point(black_box(Vec2::new(412.0, 77.0)), window, field))
    });

    c.bench_function("update_pointer", |b| {
        let mut registry = SourceRegistry::new();
        registry.initialize_grid(800, 600, 100);
        b.iter(|| registry.update_pointer(black_box(Vec2::new(412.0, 77.0)), window, field))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let params = FieldParams::default();

    for stride in [100u32, 10] {
        let mut registry = SourceRegistry::new();
        registry.initialize_grid(800, 600, stride);
        let field = SharedField::new((), FieldExtent::new(800, 600));
        let mut dispatcher = FieldDispatcher::new(NullBackend, field);

        group.bench_with_input(
            BenchmarkId::new("sources", registry.len()),
            &registry,
            |b, registry| b.iter(|| dispatcher.dispatch(registry.snapshot(), &params)),
        );
    }

    group.finish();
}

fn bench_host_field(c: &mut Criterion) {
    let mut registry = SourceRegistry::new();
    registry.initialize_grid(800, 600, 100);
    let params = FieldParams::default();

    c.bench_function("field_intensity_64_sources", |b| {
        b.iter(|| field_intensity(black_box(IVec2::new(412, 77)), registry.points(), &params))
    });
}

criterion_group!(benches, bench_grid, bench_pointer, bench_dispatch, bench_host_field);
criterion_main!(benches);
