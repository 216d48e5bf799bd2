use criterion::{Criterion, criterion_group, criterion_main};
use sketchc::build::{SketchWalker, ephemeral_build_dir};
use sketchc::config::Settings;
use sketchc::props::{PropertyForm, PropertySource, merge, tokenize};
use sketchc::toolchain::Fqbn;
use std::hint::black_box;
use std::path::Path;

const COMBINED: &str = r#"build.extra_flags="-DPIN=13 -DNAME=\"blink\"",compiler.cpp.extra_flags=-O2 upload.speed=115200"#;

const MOCK_CONFIG: &str = r#"
[sketch]
always_export_binaries = true

[compiler]
cli_path = "/opt/arduino/arduino-cli"
"#;

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_single", |b| {
        b.iter(|| {
            tokenize(
                black_box(r#"build.extra_flags="-DFOO=\"bar baz\"""#),
                PropertyForm::Single,
            )
            .unwrap()
        })
    });

    c.bench_function("tokenize_combined", |b| {
        b.iter(|| tokenize(black_box(COMBINED), PropertyForm::Combined).unwrap())
    });
}

fn bench_merge(c: &mut Criterion) {
    let sources = vec![
        PropertySource::Single("build.extra_flags=-DA=1".to_string()),
        PropertySource::Combined(COMBINED.to_string()),
        PropertySource::Single("build.extra_flags=-DA=2".to_string()),
    ];
    c.bench_function("merge_mixed_sources", |b| {
        b.iter(|| merge(black_box(&sources)).unwrap())
    });
}

fn bench_paths(c: &mut Criterion) {
    c.bench_function("ephemeral_build_dir", |b| {
        b.iter(|| ephemeral_build_dir(black_box(Path::new("/home/user/Arduino/Blink"))))
    });

    c.bench_function("fqbn_parse", |b| {
        b.iter(|| Fqbn::parse(black_box("esp32:esp32:esp32:PSRAM=enabled,FlashMode=qio")).unwrap())
    });
}

fn bench_config_parse(c: &mut Criterion) {
    c.bench_function("parse_sketchc_toml", |b| {
        b.iter(|| {
            let _: Settings = toml::from_str(black_box(MOCK_CONFIG)).unwrap();
        })
    });
}

fn bench_walk(c: &mut Criterion) {
    let temp_dir = std::env::temp_dir().join("sketchc_bench_walk").join("Blink");
    if !temp_dir.exists() {
        std::fs::create_dir_all(temp_dir.join("src")).unwrap();
        std::fs::write(temp_dir.join("Blink.ino"), "void setup() {}\nvoid loop() {}\n").unwrap();
        for i in 0..20 {
            std::fs::write(temp_dir.join("src").join(format!("mod{}.cpp", i)), "").unwrap();
        }
    }

    c.bench_function("walk_sketch", |b| {
        b.iter(|| SketchWalker::new(black_box(&temp_dir)).walk().unwrap())
    });
}

criterion_group!(
    benches,
    bench_tokenize,
    bench_merge,
    bench_paths,
    bench_config_parse,
    bench_walk
);
criterion_main!(benches);
