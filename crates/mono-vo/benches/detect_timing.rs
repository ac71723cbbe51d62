use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mono_vo::core::synthetic::{facing_rotation, homography_from_pose, render_checkerboard, RenderParams};
use mono_vo::core::{frame_view, BoardSpec};
use mono_vo::detect::ScaledChessboardFinder;
use mono_vo::{BoardFinder, DetectorParams};
use nalgebra::{Matrix3, Vector3};

fn bench_find(c: &mut Criterion) {
    let board = BoardSpec::new(7, 8, 25.4).expect("board");
    let k = Matrix3::new(800.0, 0.0, 320.0, 0.0, 800.0, 240.0, 0.0, 0.0, 1.0);
    let h = homography_from_pose(
        &k,
        &facing_rotation(0.1, -0.15, 0.05),
        &Vector3::new(-80.0, -90.0, 600.0),
    );
    let img = render_checkerboard(&board, &h, 640, 480, RenderParams::default()).expect("render");

    let mut group = c.benchmark_group("find_board_640x480");
    for scale in [1.0, 0.5] {
        let finder = ScaledChessboardFinder::new(DetectorParams::default(), scale).expect("finder");
        group.bench_function(format!("scale_{scale}"), |b| {
            b.iter(|| finder.find(black_box(&frame_view(&img)), &board))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_find);
criterion_main!(benches);
