//! # ECS Benchmark
//!
//! Measures the registry's hot paths:
//! 1. Entity creation with two components
//! 2. `for_each` over a mixed population (cost follows live entities)
//! 3. Random component lookups through the per-entity handle table

#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::ecs::{Component, Entity, World};
use tessera_core::StorageConfig;

#[derive(Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Clone, Copy, Default)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Position {}
impl Component for Velocity {}

const COUNTS: [usize; 3] = [1_000, 10_000, 50_000];

fn populated_world(count: usize) -> (World, Vec<Entity>) {
    let mut config = StorageConfig::default();
    config.ecs.entity_capacity = count;
    config.ecs.component_capacity = count;
    let mut world = World::new(config);

    let entities = (0..count)
        .map(|i| {
            let entity = world.create_entity();
            world.add_component_with(
                entity,
                Position {
                    x: i as f32,
                    y: 0.0,
                    z: 0.0,
                },
            );
            // Half the population moves.
            if i % 2 == 0 {
                world.add_component_with(
                    entity,
                    Velocity {
                        x: 0.1,
                        y: 0.2,
                        z: 0.3,
                    },
                );
            }
            entity
        })
        .collect();
    (world, entities)
}

fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("ecs_create");
    group.sample_size(20);

    for count in COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated_world(count).0.entity_count()));
        });
    }
    group.finish();
}

fn bench_for_each(c: &mut Criterion) {
    let mut group = c.benchmark_group("ecs_for_each");

    for count in COUNTS {
        let (mut world, _) = populated_world(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                world.for_each::<(Position, Velocity)>(|_, (position, velocity)| {
                    position.x += velocity.x * 0.016;
                    position.y += velocity.y * 0.016;
                    position.z += velocity.z * 0.016;
                });
            });
        });
    }
    group.finish();
}

fn bench_random_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("ecs_random_get");

    for count in COUNTS {
        let (world, entities) = populated_world(count);
        // Fixed xorshift sequence so every run reads the same entities.
        let mut state = 0x2545_f491_4f6c_dd1d_u64;
        let picks: Vec<Entity> = (0..1_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                entities[(state % count as u64) as usize]
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for entity in &picks {
                    let position = world.get_component::<Position>(*entity);
                    sum += position.x + position.y + position.z;
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_create, bench_for_each, bench_random_get);
criterion_main!(benches);
