//! `datatalk classify` - show how the vocabulary reads an utterance.

use datatalk_intents::Vocabulary;

pub fn run(utterance: &str) {
    let classification = Vocabulary::new().classify(utterance);

    match &classification.intent {
        Some(intent) => println!("\n🎯 Intent: {} (score {})", intent, classification.score),
        None => println!("\n🤷 No intent matched"),
    }
    for (name, value) in &classification.params {
        println!("   {} = {}", name, value);
    }
}
