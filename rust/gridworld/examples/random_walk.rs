extern crate gridworld;

use gridworld::*;
use rand::prelude::*;

fn main() {
    let world = World::from_rows(
        0.8,
        &["S...A...", ".WW.WWW.", "..H...M.", ".WW2WW..", ".......G"],
    )
    .unwrap();
    println!("{world}\n");

    let env = &mut GridEnvironment::new(world, 2718).with_max_episode_steps(1000);
    let rng = &mut StdRng::seed_from_u64(2718);

    for ep in 0..10 {
        env.reset();
        loop {
            let si = env.step(Action::ALL[rng.gen_range(0..N_ACTIONS)]);
            if si.terminated || si.truncated {
                break;
            }
        }
        println!(
            "Finished episode {} after {} steps with total reward {}",
            ep,
            env.steps(),
            env.score()
        );
    }
}
