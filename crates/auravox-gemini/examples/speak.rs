//! Synthesize one sentence and write it to `speech.wav`.
//!
//! ```sh
//! GEMINI_API_KEY=... cargo run -p auravox-gemini --example speak -- "Hola mundo"
//! ```

use anyhow::Context;
use auravox_core::SpeechSynthesizer;
use auravox_gemini::GeminiSynthesizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let synthesizer = GeminiSynthesizer::from_env().context("set GEMINI_API_KEY first")?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        "Había una vez una lectora que nunca dormía.".to_string()
    } else {
        args.join(" ")
    };

    let clip = synthesizer.synthesize(&text, "voice_margarita").await?;
    std::fs::write("speech.wav", &clip.bytes).context("writing speech.wav")?;
    println!(
        "wrote speech.wav: {} bytes, {:.1}s at {} Hz",
        clip.bytes.len(),
        clip.duration.as_secs_f64(),
        clip.sample_rate
    );
    Ok(())
}
