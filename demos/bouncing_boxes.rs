use sweepbonk::*;

fn main() {
    let mut physics = PhysicsManager::new(PhysicsConfig::with_bounds(Rect::new(-200.0, -200.0, 400.0, 400.0)));

    // Closed arena.
    physics.create_obstacle(Rect::new(-110.0, -110.0, 220.0, 10.0));
    physics.create_obstacle(Rect::new(-110.0, 100.0, 220.0, 10.0));
    physics.create_obstacle(Rect::new(-110.0, -100.0, 10.0, 200.0));
    physics.create_obstacle(Rect::new(100.0, -100.0, 10.0, 200.0));

    let a = physics.create_physical_object();
    physics.set_rect(a, Rect::new(-50.0, 0.0, 10.0, 10.0)).unwrap();
    physics.set_velocity(a, Vec2::new(120.0, 35.0)).unwrap();

    let b = physics.create_physical_object();
    physics.set_rect(b, Rect::new(40.0, 5.0, 10.0, 10.0)).unwrap();
    physics.set_velocity(b, Vec2::new(-90.0, 0.0)).unwrap();
    physics.set_mass(b, 3.0).unwrap();

    let c = physics.create_physical_object();
    physics.set_rect(c, Rect::new(0.0, 60.0, 8.0, 8.0)).unwrap();
    physics.set_force(c, Vec2::new(0.0, -98.0)).unwrap();

    physics.cfg.enable_timing = true;
    for frame in 0..240 {
        physics.on_update(1.0 / 60.0);
        if frame % 30 == 0 {
            physics.render(|key, r| {
                println!("frame {frame:3} {key:?} at ({:7.2},{:7.2})", r.x, r.y);
            });
            if let Some(t) = physics.timing() {
                println!("  tick={:.3}ms contacts={} corrections={}", t.total_ms, t.contacts, t.corrections);
            }
        }
    }
}
