use criterion::{black_box, criterion_group, criterion_main, Criterion};
use filemagic::{Flag, FlagSet, Parameter, ParameterMap};

fn bench_flag_masks(c: &mut Criterion) {
    let all: FlagSet = Flag::ALL.into_iter().collect();
    let mask = all.to_mask();

    c.bench_function("flagset_from_mask_all", |b| b.iter(|| FlagSet::from_mask(black_box(mask))));
    c.bench_function("flagset_to_native_all", |b| b.iter(|| black_box(&all).to_native()));
}

fn bench_flag_text(c: &mut Criterion) {
    let flags = Flag::Mime | Flag::Symlink | Flag::Compress | Flag::NoCheckElf;
    let text = flags.to_string();

    c.bench_function("flagset_display", |b| b.iter(|| black_box(&flags).to_string()));
    c.bench_function("flagset_parse", |b| b.iter(|| black_box(text.as_str()).parse::<FlagSet>()));
}

fn bench_parameter_map(c: &mut Criterion) {
    let map: ParameterMap = Parameter::ALL.iter().map(|&p| (p, p.native() as usize * 64)).collect();

    c.bench_function("parameter_map_display", |b| b.iter(|| black_box(&map).to_string()));
    c.bench_function("parameter_map_json", |b| b.iter(|| serde_json::to_string(black_box(&map))));
}

criterion_group!(benches, bench_flag_masks, bench_flag_text, bench_parameter_map);
criterion_main!(benches);
