use sweepbonk::*;

fn main() {
    let mut world = CollisionWorld::new(Rect::new(-100.0, -100.0, 200.0, 200.0));

    let wall = world.create_box();
    world.set_rect(wall, Rect::new(2.0, -0.5, 1.0, 1.0)).unwrap();
    world.set_src(wall, CollisionLayer::Obstacle).unwrap();

    let enemy = world.create_box();
    world.set_rect(enemy, Rect::new(4.0, -0.5, 1.0, 1.0)).unwrap();
    world.set_src(enemy, CollisionLayer::Enemy).unwrap();

    let layers = LayerSet::of(&[CollisionLayer::Obstacle, CollisionLayer::Enemy]);
    for (label, filter) in [("all", layers), ("enemy only", LayerSet::EMPTY.with(CollisionLayer::Enemy))] {
        if let Some((key, hit)) = world.raycast(Vec2::ZERO, Vec2::X, 100.0, filter) {
            println!("[{label}] ray hit key={:?} t={:.3} n=({:.2},{:.2})", key, hit.toi, hit.normal.x, hit.normal.y);
        } else {
            println!("[{label}] no hit");
        }
    }
}
