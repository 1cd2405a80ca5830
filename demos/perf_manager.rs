use std::time::Instant;
use sweepbonk::*;

fn lcg(seed: &mut u32) -> u32 {
    *seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
    *seed
}

fn unit(seed: &mut u32) -> f32 {
    lcg(seed) as f32 / u32::MAX as f32
}

fn main() {
    for mode in [StepMode::Independent, StepMode::GlobalEarliest] {
        let mut cfg = PhysicsConfig::with_bounds(Rect::new(-512.0, -512.0, 1024.0, 1024.0)).with_step_mode(mode);
        cfg.enable_timing = true;
        let mut physics = PhysicsManager::new(cfg);

        let n = 500usize; // number of bodies
        let mut seed = 1u32;
        for _ in 0..n {
            let key = physics.create_physical_object();
            let x = unit(&mut seed) * 800.0 - 400.0;
            let y = unit(&mut seed) * 800.0 - 400.0;
            let vx = unit(&mut seed) * 100.0 - 50.0;
            let vy = unit(&mut seed) * 100.0 - 50.0;
            physics.set_rect(key, Rect::new(x, y, 4.0, 4.0)).unwrap();
            physics.set_velocity(key, Vec2::new(vx, vy)).unwrap();
        }
        for i in 0..20 {
            let x = unit(&mut seed) * 800.0 - 400.0;
            let y = unit(&mut seed) * 800.0 - 400.0;
            let (w, h) = if i % 2 == 0 { (40.0, 4.0) } else { (4.0, 40.0) };
            physics.create_obstacle(Rect::new(x, y, w, h));
        }

        let frames = 60;
        let t0 = Instant::now();
        let mut contacts = 0;
        let mut corrections = 0;
        for _ in 0..frames {
            physics.on_update(1.0 / 60.0);
            if let Some(t) = physics.timing() {
                contacts += t.contacts;
                corrections += t.corrections;
            }
        }
        let elapsed = t0.elapsed();
        let stats = physics.debug_stats();
        println!(
            "mode={:?} N={} frames={} total={:?} per_frame={:.3}ms contacts={} corrections={} indexed={}/{} nodes={}",
            mode,
            n,
            frames,
            elapsed,
            elapsed.as_secs_f64() * 1000.0 / frames as f64,
            contacts,
            corrections,
            stats.indexed,
            stats.boxes,
            stats.nodes
        );
    }
}
