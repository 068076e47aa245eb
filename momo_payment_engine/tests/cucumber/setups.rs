use cucumber::given;

use crate::cucumber::{world::MomoSystem, MomoWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut MomoWorld) {
    let system = MomoSystem::new().await;
    world.system = Some(system);
}
