//! Benchmarks for style compilation, resolution and the animated graph.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use strata::animated::{AnimatedGraph, Extrapolate, InterpolationConfig};
use strata::style::{StyleContext, StyleInput, StyleOptions, preprocess};
use strata::{Style, style};

fn card() -> Style {
    style! {
        "alignItems" => "center",
        "backgroundColor" => "#fafafa",
        "borderColor" => "rgba(0,0,0,0.12)",
        "borderRadius" => 8,
        "borderWidth" => 1,
        "marginHorizontal" => 16,
        "paddingVertical" => 12,
        "shadowColor" => "black",
        "shadowOpacity" => 0.2,
        "shadowRadius" => 4,
        "transform" => vec![strata::style::TransformEntry::new("scale", 1.5)],
    }
}

// ============================================================================
// Style Benchmarks
// ============================================================================

fn bench_preprocess(c: &mut Criterion) {
    let style = card();
    let options = StyleOptions::default();
    c.bench_function("preprocess", |b| {
        b.iter(|| preprocess(black_box(&style), &options));
    });
}

fn bench_register(c: &mut Criterion) {
    c.bench_function("register_fresh_context", |b| {
        b.iter(|| {
            let mut context = StyleContext::default();
            context.register(black_box(card()))
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut context = StyleContext::default();
    let base = context.register(card());
    let pressed = context.register(style! { "opacity" => 0.5, "marginLeft" => 4 });
    let input = StyleInput::list([base.into(), pressed.into()]);

    c.bench_function("resolve_memoized", |b| {
        b.iter(|| context.resolve(black_box(&input), &StyleOptions::default()));
    });

    let dynamic = StyleInput::list([
        base.into(),
        style! { "width" => 120, "paddingStart" => 6 }.into(),
    ]);
    c.bench_function("resolve_with_inline", |b| {
        b.iter(|| context.resolve(black_box(&dynamic), &StyleOptions::rtl()));
    });
}

// ============================================================================
// Animated Benchmarks
// ============================================================================

fn bench_interpolate_color(c: &mut Criterion) {
    let mut graph = AnimatedGraph::new();
    let progress = graph.value(0.0);
    let color = graph
        .interpolate(
            progress,
            InterpolationConfig::new(
                vec![0.0, 1.0],
                vec!["rgba(255, 0, 0, 1)", "rgba(0, 0, 255, 0.5)"],
            )
            .extrapolate(Extrapolate::Clamp),
        )
        .unwrap();

    c.bench_function("interpolate_color", |b| {
        let mut t = 0.0;
        b.iter(|| {
            t = (t + 0.01) % 1.0;
            graph.set_value(progress, t).unwrap();
            graph.get_value(black_box(color)).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_preprocess,
    bench_register,
    bench_resolve,
    bench_interpolate_color,
);
criterion_main!(benches);
