// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use understory_sheet::{
    BasicStringifier, ComponentStyle, MemoryElement, Registry, RuleSet, Sheet, SheetOptions,
    StyleElement, parse_style_tags,
};

struct Props {
    size: u32,
}

fn components(registry: &Registry, count: usize) -> Vec<ComponentStyle<Props>> {
    (0..count)
        .map(|i| {
            let rules = RuleSet::new()
                .css(format!("display: block; order: {i};"))
                .dynamic(|p: &Props| format!("width: {}px;", p.size).into());
            ComponentStyle::new(rules, registry.generate_component_id("Box"), registry)
        })
        .collect()
}

/// Renders every component with `sizes` distinct contexts, in reverse
/// registration order so every insertion lands before existing groups.
fn render_all(styles: &[ComponentStyle<Props>], sizes: u32, sheet: &mut Sheet) {
    for style in styles.iter().rev() {
        for size in 0..sizes {
            black_box(style.generate_and_inject_styles(
                &Props { size },
                sheet,
                &BasicStringifier,
            ));
        }
    }
}

fn bench_sheet(c: &mut Criterion) {
    let mut group = c.benchmark_group("understory_sheet");
    group.sample_size(50);

    for &(count, sizes) in &[(16_usize, 4_u32), (128, 4), (512, 2)] {
        let registry = Registry::new();
        let styles = components(&registry, count);

        group.bench_function(format!("insert_server(c={count},s={sizes})"), |b| {
            b.iter_batched(
                || Sheet::server(registry.clone()),
                |mut sheet| {
                    render_all(&styles, sizes, &mut sheet);
                    black_box(sheet);
                },
                BatchSize::SmallInput,
            );
        });

        for (label, use_cssom) in [("cssom", true), ("text", false)] {
            group.bench_function(format!("insert_{label}(c={count},s={sizes})"), |b| {
                b.iter_batched(
                    || {
                        Sheet::with_target(
                            SheetOptions::default().with_cssom(use_cssom),
                            registry.clone(),
                            Box::new(MemoryElement::new()),
                        )
                    },
                    |mut sheet| {
                        render_all(&styles, sizes, &mut sheet);
                        black_box(sheet);
                    },
                    BatchSize::SmallInput,
                );
            });
        }

        let mut warm = Sheet::server(registry.clone());
        render_all(&styles, sizes, &mut warm);
        group.bench_function(format!("dedup_hit(c={count},s={sizes})"), |b| {
            b.iter(|| render_all(&styles, sizes, &mut warm));
        });

        let html = warm.to_style_tag();
        group.bench_function(format!("rehydrate(c={count},s={sizes})"), |b| {
            b.iter_batched(
                || {
                    parse_style_tags(&html, "data-styled")
                        .into_iter()
                        .map(|el| Box::new(el) as Box<dyn StyleElement>)
                        .collect::<Vec<_>>()
                },
                |containers| {
                    let mut client = Sheet::new(SheetOptions::default(), Registry::new());
                    black_box(client.rehydrate_once(containers));
                    black_box(client);
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sheet);
criterion_main!(benches);
