//! Basic demonstration of the falling-sand engine.
//!
//! Run with: cargo run --example basic_demo

use sandgrid::{MaterialId, SandWorld, SimConfig, SAND, STEAM, STONE, WATER};

fn main() {
    println!("=== sandgrid - Falling Sand Demo ===\n");

    let mut world = SandWorld::with_config(SimConfig {
        width: 80,
        height: 40,
        ..Default::default()
    });

    // A stone basin along the bottom.
    for x in 0..80 {
        world.set_cell(x, 38, STONE).unwrap();
        world.set_cell(x, 39, STONE).unwrap();
    }
    for y in 20..38 {
        world.set_cell(0, y, STONE).unwrap();
        world.set_cell(79, y, STONE).unwrap();
    }

    // Pour sand and water from two spouts while steam bubbles up from the
    // floor, stepping as we go.
    println!("Pouring for 120 steps...\n");
    for i in 0..120 {
        if i % 2 == 0 {
            world.set_cell(25, 2, SAND).unwrap();
            world.set_cell(55, 2, WATER).unwrap();
        }
        if i % 10 == 0 {
            world.set_cell(40, 37, STEAM).unwrap();
        }
        world.step();

        if (i + 1) % 40 == 0 {
            println!("--- Step {} ({} active chunks) ---", world.current_step(), world.active_chunk_count());
            render(&world);
        }
    }

    // Let everything settle.
    println!("Settling for 200 steps...\n");
    for _ in 0..200 {
        world.step();
    }
    println!("--- Step {} ({} active chunks) ---", world.current_step(), world.active_chunk_count());
    render(&world);

    // Final census as JSON.
    let snapshot = world.snapshot();
    println!("\n=== Final Census (JSON) ===\n");
    println!("{}", serde_json::to_string_pretty(&snapshot.census).unwrap());
}

fn render(world: &SandWorld) {
    for y in 0..world.height() {
        let mut row = String::with_capacity(world.width() as usize);
        for x in 0..world.width() {
            row.push(glyph(world.material_at(x, y)));
        }
        println!("{}", row);
    }
    println!();
}

fn glyph(material: MaterialId) -> char {
    match material {
        STONE => '#',
        SAND => 'o',
        WATER => '~',
        STEAM => '*',
        _ => '.',
    }
}
