// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Falling crates example
//!
//! Drops a row of crates onto a floor and fires a ray across the scene
//! each second, reporting which entity it hits.

use frenetic_core::engine::{BasicEngine, EntityId};
use frenetic_core::physics::{BodyDesc, PhysicsEntityProperty, SimpleWorld};
use frenetic_core::property::Property;
use frenetic_core::EngineConfig;
use glam::DVec3;

const FRAME: f64 = 1.0 / 60.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Frenetic Core - Falling Crates");
    println!("==============================\n");

    let config = EngineConfig::from_env()?;
    let world = SimpleWorld::default().with_floor(0.0);
    let mut engine: BasicEngine = BasicEngine::with_backend(config, Box::new(world))?;
    println!("Gravity: {:?}", engine.physics().gravity());

    let mut crates: Vec<EntityId> = Vec::new();
    for i in 0..5 {
        let height = 2.0 + i as f64 * 3.0;
        let body = BodyDesc::sphere(0.5)
            .at(DVec3::new(i as f64 * 2.0, 0.0, height))
            .with_mass(10.0);
        let id = engine.spawn_entity(false, vec![PhysicsEntityProperty::new(body).into_boxed()])?;
        println!("  {} dropped from z={:.1}", id, height);
        crates.push(id);
    }

    // A fixed post the ray must ignore
    let post = engine.spawn_entity(
        false,
        vec![PhysicsEntityProperty::new(BodyDesc::sphere(0.25).at(DVec3::new(-2.0, 0.0, 0.5)).immovable())
            .into_boxed()],
    )?;
    let ignore_post = move |entity: EntityId| entity != post;

    println!("\nTracing a ray along +X at z=0.5 every second:");
    for second in 1..=4 {
        for _ in 0..60 {
            engine.tick(FRAME);
        }

        let origin = DVec3::new(-5.0, 0.0, 0.5);
        match engine
            .physics()
            .ray_trace_single(origin, DVec3::X, 50.0, Some(&ignore_post))
        {
            Some(hit) => println!(
                "  t={}s: hit {} at distance {:.2} (point {:.2?})",
                second, hit.entity, hit.distance, hit.point
            ),
            None => println!("  t={}s: nothing on the floor yet", second),
        }
    }

    println!("\nResting heights:");
    for id in &crates {
        if let Some(state) = engine.physics().body_state(*id) {
            println!("  {}: z={:.3}", id, state.position.z);
        }
    }

    let landed = engine
        .physics()
        .ray_trace_all(DVec3::new(-5.0, 0.0, 0.5), DVec3::X, 50.0, Some(&ignore_post))
        .len();
    println!("\n{} of {} crates are on the floor", landed, crates.len());

    engine.shutdown()?;
    Ok(())
}
