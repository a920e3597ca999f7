use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use godly_scroll::{CellGrid, Glyph, ScrollEngine, StyleBits};

fn make_grid(rows: u16, cols: u16) -> CellGrid {
    let mut grid = CellGrid::new(rows, cols);
    for r in 0..rows {
        for (c, cell) in grid.bg_row_mut(r).iter_mut().enumerate() {
            *cell = u32::from(r) * 1000 + c as u32;
        }
        let fg = grid.fg_row_mut(r);
        for c in 0..cols {
            fg.push(Glyph::new(r, c, StyleBits::default()));
        }
    }
    grid
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_engine_flush");

    for &(rows, cols) in &[(24u16, 80u16), (50, 160), (100, 300)] {
        let grid = make_grid(rows, cols);
        group.throughput(Throughput::Elements(u64::from(rows) * u64::from(cols)));
        group.bench_with_input(
            BenchmarkId::new("flush_with_scroll", format!("{rows}x{cols}")),
            &grid,
            |b, grid| {
                let mut engine = ScrollEngine::new();
                b.iter(|| {
                    engine.queue_scroll(1, 1, rows - 1, 0, 0);
                    engine.flush(grid, 1.0 / 60.0, 0.3).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_populate_and_restore(c: &mut Criterion) {
    let mut group = c.benchmark_group("scroll_engine_populate_restore");

    for &(rows, cols) in &[(24u16, 80u16), (50, 160)] {
        let grid = make_grid(rows, cols);
        let mut engine = ScrollEngine::new();
        engine.queue_scroll(3, 1, rows - 1, 0, 0);
        engine.flush(&grid, 1.0 / 60.0, 0.3).unwrap();

        group.throughput(Throughput::Elements(u64::from(rows) * u64::from(cols)));
        group.bench_with_input(
            BenchmarkId::new("populate_then_restore", format!("{rows}x{cols}")),
            &grid,
            |b, grid| {
                b.iter(|| {
                    let mut render_grid = grid.clone();
                    engine.populate_cells_for_render(&mut render_grid);
                    engine.restore_cells(&mut render_grid);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_flush, bench_populate_and_restore);
criterion_main!(benches);
