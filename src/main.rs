use std::{
    fs,
    future::{self, Future},
    io::{self, BufWriter, Write},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    process,
};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use machine_learning::{optimization::Adam, training::Cancellation};
use rand::{SeedableRng, rngs::StdRng};
use tokio::{signal, task};

use infection_risk::{
    classifier::Classifier,
    config::EvaluatorConfig,
    inference::{EvaluationRequest, InferenceService},
    persistence, prompt,
    sampler::{PatientSampler, make_splits},
    training,
};

#[derive(Debug, Parser)]
#[command(
    name = "infection-risk",
    version,
    about = "Trains and queries a classifier estimating the probability of infection"
)]
struct Cli {
    /// JSON file with settings, flags take precedence over it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train on freshly sampled synthetic patients and save the result
    Train(TrainArgs),
    /// Ask for patients interactively and print their estimated probability
    Eval(EvalArgs),
    /// Evaluate a JSON request file and print the evaluation as JSON
    Estimate(EstimateArgs),
}

#[derive(Debug, Args)]
struct ModelArgs {
    /// Hidden layer width [default: 20]
    #[arg(long)]
    hidden_size: Option<NonZeroUsize>,
}

#[derive(Debug, Args)]
struct TrainArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(long)]
    seed: Option<u64>,

    /// [default: 16]
    #[arg(long)]
    train_batch_size: Option<NonZeroUsize>,

    /// [default: 128]
    #[arg(long)]
    eval_batch_size: Option<NonZeroUsize>,

    /// Learning rate [default: 0.001]
    #[arg(long)]
    lr: Option<f32>,

    /// [default: 20]
    #[arg(long)]
    epochs: Option<usize>,

    /// Artifact to resume from, optimizer state included
    #[arg(long)]
    load: Option<PathBuf>,

    #[arg(long, default_value = "model.safetensors")]
    save: PathBuf,
}

#[derive(Debug, Args)]
struct EvalArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(long)]
    load: PathBuf,
}

#[derive(Debug, Args)]
struct EstimateArgs {
    #[command(flatten)]
    model: ModelArgs,

    #[arg(long)]
    load: PathBuf,

    /// JSON file holding the patient fields plus `continent` and `country`
    request: PathBuf,
}

impl ModelArgs {
    fn apply(&self, config: &mut EvaluatorConfig) {
        if let Some(hidden_size) = self.hidden_size {
            config.hidden_size = hidden_size;
        }
    }
}

impl TrainArgs {
    fn apply(&self, config: &mut EvaluatorConfig) {
        self.model.apply(config);
        config.seed = self.seed.or(config.seed);
        config.train_batch_size = self.train_batch_size.unwrap_or(config.train_batch_size);
        config.eval_batch_size = self.eval_batch_size.unwrap_or(config.eval_batch_size);
        config.learning_rate = self.lr.unwrap_or(config.learning_rate);
        config.epochs = self.epochs.unwrap_or(config.epochs);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EvaluatorConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EvaluatorConfig::default(),
    };

    match cli.command {
        Command::Train(args) => {
            args.apply(&mut config);
            config.validate()?;
            train(config, args.load, args.save).await
        }
        Command::Eval(args) => {
            args.model.apply(&mut config);
            let service = load_service(&args.load, &config)?;
            task::spawn_blocking(move || interactive(&service)).await?
        }
        Command::Estimate(args) => {
            args.model.apply(&mut config);
            let service = load_service(&args.load, &config)?;
            estimate(&service, &args.request)
        }
    }
}

async fn train(
    config: EvaluatorConfig,
    load: Option<PathBuf>,
    save: PathBuf,
) -> anyhow::Result<()> {
    let cancel = Cancellation::new();
    let interrupted = interrupts(cancel.clone(), signal::ctrl_c);

    let run = task::spawn_blocking(move || -> anyhow::Result<_> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let (mut classifier, mut optimizer) = match &load {
            Some(path) => persistence::load(path, config.hidden_size)
                .with_context(|| format!("loading {}", path.display()))?,
            None => {
                let classifier = Classifier::new(config.hidden_size, &mut rng)?;
                let optimizer =
                    Adam::with_learning_rate(classifier.params().len(), config.learning_rate)?;
                (classifier, optimizer)
            }
        };

        let sampler = PatientSampler::new()?;
        let mut splits = make_splits(&sampler, config.splits, &mut rng)?;
        info!(
            train = splits.train.len(),
            valid = splits.valid.len(),
            test = splits.test.len();
            "datasets ready"
        );

        let report = training::train(
            &mut classifier,
            &mut optimizer,
            &mut splits,
            &config,
            &mut rng,
            &cancel,
        )?;

        persistence::save(&save, &classifier, &optimizer)
            .with_context(|| format!("saving {}", save.display()))?;
        Ok(report)
    });

    let report = tokio::select! {
        ret = run => ret??,
        _ = interrupted => {
            warn!("interrupted again, exiting without saving");
            process::exit(130);
        }
    };

    println!("test accuracy: {:.3}%", report.test_accuracy * 100.);
    Ok(())
}

/// Raises `cancel` on the first interrupt and resolves on the second one.
///
/// Never resolves if listening for interrupts fails.
async fn interrupts<F, Fut>(cancel: Cancellation, mut interrupt: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if interrupt().await.is_err() {
        return future::pending().await;
    }

    info!("interrupt received, finishing up");
    cancel.cancel();

    if interrupt().await.is_err() {
        future::pending::<()>().await;
    }
}

fn load_service(path: &Path, config: &EvaluatorConfig) -> anyhow::Result<InferenceService> {
    let (classifier, _) = persistence::load(path, config.hidden_size)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(InferenceService::new(classifier))
}

fn interactive(service: &InferenceService) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    while let Some(record) = prompt::read_record(&mut input, &mut output)? {
        let probability = service.estimate(&record)?;
        writeln!(output, "estimated probability: {:.3}%", probability * 100.)?;
    }

    Ok(())
}

fn estimate(service: &InferenceService, request: &Path) -> anyhow::Result<()> {
    let raw =
        fs::read_to_string(request).with_context(|| format!("reading {}", request.display()))?;
    let request: EvaluationRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", request.display()))?;

    if request.record.is_empty() {
        bail!("the request holds no clinical fields");
    }

    let evaluation = service.evaluate(request)?;
    let mut out = BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut out, &evaluation)?;
    writeln!(out)?;

    Ok(())
}
