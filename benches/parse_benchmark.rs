//! Performance benchmarks for the vendor output decoders
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use licmon::{flexlm, rlm};
use std::fmt::Write;

/// Generate lmstat-shaped output with the given number of features, each
/// carrying a usage section and a pool table row.
fn generate_lmstat_output(features: usize, users_per_feature: usize, noise: bool) -> String {
    let mut out = String::from("  licserv: license server UP (MASTER) v11.16.2\n\n");

    for f in 0..features {
        writeln!(
            out,
            "Users of feat{f}:  (Total of {} licenses issued;  Total of {} licenses in use)",
            users_per_feature * 2,
            users_per_feature
        )
        .unwrap();
        writeln!(out, "  \"feat{f}\" v1.0, vendor: vend, expiry: 31-dec-2030").unwrap();
        for u in 0..users_per_feature {
            writeln!(
                out,
                "    user{u} host{u} /dev/pts/{u} (v1.0) (licserv/27000 {u}), start Wed 3/17 10:20"
            )
            .unwrap();
        }
        if noise {
            out.push_str("  server log: heartbeat ok\n");
            out.push_str("  (lmgrd) periodic diagnostic chatter\n");
        }
        out.push('\n');
    }

    out.push_str("Feature                         Version     #licenses    Vendor        Expires\n");
    out.push_str("_______                         _________   _________    ______        ________\n");
    for f in 0..features {
        writeln!(out, "feat{f}    1.0    {}    vend    31-dec-2030", users_per_feature * 2).unwrap();
    }
    out
}

fn generate_rlmstat_output(features: usize, users_per_feature: usize) -> String {
    let mut out = String::from(
        "\trlm status on licserv (port 5053), up 21d 08:25:38\n\
         \trlm software version v12.2 (build:2)\n\n\
         \tvend ISV server status on port 63133, up 21d 08:25:35\n\n",
    );

    for f in 0..features {
        writeln!(out, "\tfeat{f} v1.0, pool: 1").unwrap();
        writeln!(
            out,
            "\t\tcount: {}, # reservations: 0, inuse: {}, exp: 31-dec-2030",
            users_per_feature * 2,
            users_per_feature
        )
        .unwrap();
        for u in 0..users_per_feature {
            writeln!(out, "\tfeat{f} v1.0: user{u}@host{u} 1/0 at 08/24 10:21  (handle: {u})")
                .unwrap();
        }
        out.push('\n');
    }
    out
}

fn benchmark_flexlm_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("flexlm_parse");

    for size in [5, 50, 500].iter() {
        let raw = generate_lmstat_output(*size, 4, false);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| flexlm::parse(black_box("27000@licserv"), black_box(&raw)));
        });
    }

    group.finish();
}

fn benchmark_rlm_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("rlm_parse");

    for size in [5, 50, 500].iter() {
        let raw = generate_rlmstat_output(*size, 4);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| rlm::parse(black_box("5053@licserv"), black_box(&raw)));
        });
    }

    group.finish();
}

fn benchmark_classifier_fallthrough(c: &mut Criterion) {
    let mut group = c.benchmark_group("classifier_fallthrough");

    // Unmatched lines walk the whole recognizer chain; measure that cost.
    let noisy = generate_lmstat_output(100, 4, true);
    group.bench_function("flexlm_with_noise", |b| {
        b.iter(|| flexlm::parse(black_box("27000@licserv"), black_box(&noisy)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_flexlm_parse,
    benchmark_rlm_parse,
    benchmark_classifier_fallthrough
);
criterion_main!(benches);
