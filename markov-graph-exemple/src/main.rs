use markov_graph_core::tokenizer::tokenize;
use markov_graph_core::{GenerationInput, StartSeed, TransitionGraph};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

const FABLE: &str = "A crow, having stolen a bit of meat, perched in a tree and held it in her beak. \
    A fox, seeing this, longed to possess the meat himself, and by a wily stratagem succeeded. \
    How handsome is the crow, he exclaimed, in the beauty of her shape and in the fairness of her complexion! \
    Oh, if her voice were only equal to her beauty, she would deservedly be considered the queen of birds!";

const PROVERBS: &str = "Flattery is the food of fools. The fox that waits for the crow waits long. \
    A bird in the hand is worth two in the bush.";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Train on a file given as first argument, or on the embedded fable
    let corpus = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(path)?,
        None => FABLE.to_owned(),
    };

    // The tokenizer lowercases and isolates '.' and ',' markers
    let tokens = tokenize(&corpus);
    println!("{} tokens", tokens.len());

    let mut fable = TransitionGraph::new();
    fable.train(&tokens)?;

    // Probabilities must be recalculated after every training or merge
    fable.recalculate_all();
    println!("{} nodes, {} edges", fable.len(), fable.edge_count());

    // Walk from the first token, 40 tokens after it
    let mut input = GenerationInput::new(40)?;
    println!("First: {}", fable.generate(&input).value);

    // Walk from a custom token
    input.start_seed = StartSeed::Custom("fox".to_owned());
    println!("Custom: {}", fable.generate(&input).value);

    // A seeded random source gives reproducible text
    input.start_seed = StartSeed::Random;
    let mut rng = StdRng::seed_from_u64(2024);
    for i in 0..3 {
        println!("Seeded {}: {}", i + 1, fable.generate_with_rng(&input, &mut rng).value);
    }

    // Combine with a second graph; inputs are left untouched
    let mut proverbs = TransitionGraph::new();
    proverbs.train(&tokenize(PROVERBS))?;
    proverbs.recalculate_all();

    let mut combined = fable.combine(&proverbs);
    combined.recalculate_all();
    println!("Combined: {} nodes, {} transitions seen", combined.len(), combined.tokens_seen());
    println!("Combined: {}", combined.generate(&input).value);

    // Portable form round trip
    let text = combined.to_portable_string()?;
    let bytes = combined.to_portable_bytes()?;
    println!("Portable form: {} bytes as JSON, {} bytes as postcard", text.len(), bytes.len());

    let mut restored = TransitionGraph::from_portable_str(&text)?;
    restored.recalculate_all();
    println!("Restored: {}", restored.generate(&input).value);

    // Malformed input is rejected as a whole
    match TransitionGraph::from_portable_str("crow and fox") {
        Ok(_) => println!("Should not happen"),
        Err(e) => println!("Rejected: {e}"),
    }

    Ok(())
}
