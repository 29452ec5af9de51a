//! Plinko Drop entry point
//!
//! Native builds run a batch of headless drops and log how close each ball
//! landed to its target. The browser build is driven through the `wasm`
//! bindings in the library instead.

#[cfg(not(target_arch = "wasm32"))]
use plinko_drop::sim::{Dimensions, Target};
#[cfg(not(target_arch = "wasm32"))]
use plinko_drop::{Board, BoardEvent, BoardSettings};

#[cfg(not(target_arch = "wasm32"))]
const FRAME_MS: f64 = 1000.0 / 60.0;
/// Frames before a drop is given up on (one minute of simulated time)
#[cfg(not(target_arch = "wasm32"))]
const MAX_FRAMES: u32 = 3600;

#[cfg(not(target_arch = "wasm32"))]
struct DropResult {
    target: Target,
    landed_x: Option<f32>,
    frames: u32,
}

/// Drop one ball and tick until it completes
#[cfg(not(target_arch = "wasm32"))]
fn run_drop(board: &mut Board, token: u64, target: Target) -> DropResult {
    board.set_target(target);
    board.set_reset_token(token);
    board.set_running(true);

    let mut now = token as f64 * MAX_FRAMES as f64 * FRAME_MS;
    let mut landed_x = None;
    for frames in 1..=MAX_FRAMES {
        now += FRAME_MS;
        let frame = board.tick(now);
        for event in &frame.events {
            match event {
                BoardEvent::Stopped { .. } => {
                    landed_x = frame.ball.map(|b| b.position.x);
                }
                BoardEvent::Completed { .. } => {
                    return DropResult {
                        target,
                        landed_x,
                        frames,
                    };
                }
                BoardEvent::RunStarted { .. } => {}
            }
        }
    }

    board.set_running(false);
    DropResult {
        target,
        landed_x: None,
        frames: MAX_FRAMES,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    env_logger::init();
    log::info!("Plinko Drop (native) starting...");

    // plinko-drop [settings.json] [drops] [seed]
    let args: Vec<String> = std::env::args().skip(1).collect();
    let settings = match args.first() {
        Some(path) => BoardSettings::load_from(std::path::Path::new(path)),
        None => BoardSettings::default(),
    };
    let drops: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let seed: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(12345);

    let dims = Dimensions::new(800.0, 600.0);
    let mut board = Board::new(dims, &settings);
    let mut rng = Pcg32::seed_from_u64(seed);

    // Targets span the outer column centres
    let margin = dims.column_spacing();
    let base = Target::default_for(&dims);

    let mut errors = Vec::new();
    for token in 1..=drops {
        let target = base.with_x(rng.random_range(margin..dims.width - margin));
        let result = run_drop(&mut board, token, target);
        match result.landed_x {
            Some(x) => {
                let error = (x - result.target.x).abs();
                log::info!(
                    "Drop {}: target x={:.1} landed x={:.1} error={:.1}px in {} frames",
                    token,
                    result.target.x,
                    x,
                    error,
                    result.frames
                );
                errors.push(error);
            }
            None => log::warn!("Drop {} did not land within {} frames", token, MAX_FRAMES),
        }
    }

    if errors.is_empty() {
        log::warn!("No drop landed");
        return;
    }
    let mean = errors.iter().sum::<f32>() / errors.len() as f32;
    let worst = errors.iter().copied().fold(0.0f32, f32::max);
    log::info!(
        "{} of {} drops landed: mean error {:.1}px, worst {:.1}px",
        errors.len(),
        drops,
        mean,
        worst
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is the `start` function in the library, this is just to satisfy the compiler
}
