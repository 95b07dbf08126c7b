use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use offtask_eval::{
    EvaluationResult, ModelKind, NestedCrossValidation, ParamGrid, Scoring, Smote, full_data_roc, holdout_confusion,
};
use offtask_io::{
    ClassRecord, ConfusionRecord, EvaluationRecord, ExperimentName, ExploreRecord, FeatureRecord, FeatureSet,
    FeatureSpec, FoldRecord, ResultWriter, RocRecord, Table, TableReader, correlation_matrix, describe, kind_counts,
    value_counts,
};

#[derive(Parser)]
#[command(name = "offtask")]
#[command(about = "Predict off-task behaviour from classroom interaction logs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "offtask", global = true)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = "results", global = true)]
    output_dir: PathBuf,
}

/// Input dataset and the columns that are not features.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the input CSV file
    #[arg(long, default_value = "data/ca1-dataset.csv")]
    data: PathBuf,

    /// Row identifier column
    #[arg(long, default_value = "Unique-id")]
    id_column: String,

    /// Student column; outer folds never split a student
    #[arg(long, default_value = "namea")]
    group_column: String,

    /// Label column holding Y/N
    #[arg(long, default_value = "OffTask")]
    label_column: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Rf,
    Lr,
    Svm,
    All,
}

impl ModelArg {
    fn kinds(self) -> Vec<ModelKind> {
        match self {
            Self::Rf => vec![ModelKind::RandomForest],
            Self::Lr => vec![ModelKind::LogisticRegression],
            Self::Svm => vec![ModelKind::Svm],
            Self::All => ModelKind::ALL.to_vec(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SplitModelArg {
    Rf,
    Lr,
    Svm,
}

impl From<SplitModelArg> for ModelKind {
    fn from(arg: SplitModelArg) -> Self {
        match arg {
            SplitModelArg::Rf => ModelKind::RandomForest,
            SplitModelArg::Lr => ModelKind::LogisticRegression,
            SplitModelArg::Svm => ModelKind::Svm,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ScoringArg {
    Accuracy,
    Kappa,
}

impl From<ScoringArg> for Scoring {
    fn from(arg: ScoringArg) -> Self {
        match arg {
            ScoringArg::Accuracy => Scoring::Accuracy,
            ScoringArg::Kappa => Scoring::Kappa,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Summarize the dataset: column kinds, statistics, class balance, correlations
    Explore {
        #[command(flatten)]
        input: DataArgs,
    },

    /// Nested cross-validation of one or all classifier families
    Evaluate {
        #[command(flatten)]
        input: DataArgs,

        /// Classifier family to evaluate
        #[arg(long, value_enum, default_value_t = ModelArg::All)]
        model: ModelArg,

        /// Number of group-disjoint outer folds
        #[arg(long, default_value_t = 5)]
        outer_folds: usize,

        /// Number of stratified inner folds for grid search
        #[arg(long, default_value_t = 3)]
        inner_folds: usize,

        /// SMOTE neighbour count
        #[arg(long, default_value_t = 5)]
        k_neighbors: usize,

        /// Metric ranking grid candidates on inner folds
        #[arg(long, value_enum, default_value_t = ScoringArg::Accuracy)]
        inner_scoring: ScoringArg,
    },

    /// ROC curves (train = test) and a held-out confusion matrix
    Visualize {
        #[command(flatten)]
        input: DataArgs,

        /// Fraction of rows held out for the confusion matrix
        #[arg(long, default_value_t = 0.25)]
        test_fraction: f64,

        /// Classifier family used for the confusion matrix
        #[arg(long, value_enum, default_value_t = SplitModelArg::Rf)]
        split_model: SplitModelArg,

        /// SMOTE neighbour count for the training split
        #[arg(long, default_value_t = 5)]
        k_neighbors: usize,
    },
}

fn read_table(input: &DataArgs) -> Result<Table> {
    TableReader::new(&input.data)
        .read()
        .with_context(|| format!("failed to read {}", input.data.display()))
}

fn load_features(input: &DataArgs) -> Result<FeatureSet> {
    let table = read_table(input)?;
    let spec = FeatureSpec::new(&*input.id_column, &*input.group_column, &*input.label_column)?;
    spec.split(&table).context("failed to extract features")
}

fn run_explore(input: &DataArgs, writer: &ResultWriter) -> Result<()> {
    let table = read_table(input)?;
    let label = table
        .column(&input.label_column)
        .with_context(|| format!("label column {:?} not found", input.label_column))?;

    let kinds = kind_counts(&table);
    let summaries = describe(&table);
    let correlation = correlation_matrix(&table);
    let class_distribution = value_counts(label);

    println!("Rows: {}  Columns: {}  Missing values: 0", table.n_rows(), table.n_columns());
    println!(
        "Column kinds: {} continuous, {} integer, {} categorical",
        kinds.continuous, kinds.integer, kinds.categorical
    );
    println!();
    println!("Class distribution ({}):", input.label_column);
    for (value, count) in &class_distribution {
        let share = *count as f64 / table.n_rows() as f64;
        println!("  {value:>6} {count:>6} ({:.1}%)", 100.0 * share);
    }
    println!();
    println!(
        "{:<28} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in &summaries {
        println!(
            "{:<28} {:>6} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4}",
            s.name, s.count, s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max
        );
    }

    let path = writer.write_explore(&ExploreRecord {
        n_rows: table.n_rows(),
        n_columns: table.n_columns(),
        missing_values: 0,
        kinds,
        class_distribution: &class_distribution,
        summaries: &summaries,
        correlation: &correlation,
    })?;
    println!();
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_evaluation(result: &EvaluationResult) {
    println!("=== {} ({}) ===", result.kind, result.kind.short_name());
    for fold in &result.folds {
        println!(
            "  fold {}: kappa {:.4}  inner {} {:.4}  params {:?}",
            fold.fold, fold.kappa, result.scoring, fold.inner_score, fold.params
        );
    }
    println!("Pooled Kappa: {:.4}", result.pooled_kappa);
    println!("Fold Kappa: {:.4} +/- {:.4}", result.mean_kappa, result.std_kappa);
    println!();
    println!("Confusion matrix (rows = actual):");
    print!("{}", result.confusion_matrix);
    println!();
    print!("{}", result.report);
    if !result.feature_importances.is_empty() {
        println!();
        println!("Top features (mean decrease in impurity):");
        for feature in result.feature_importances.iter().take(10) {
            println!("  {:>2}. {:<28} {:.4}", feature.rank, feature.name, feature.importance);
        }
    }
    println!();
}

fn write_evaluation(writer: &ResultWriter, result: &EvaluationResult) -> Result<PathBuf> {
    let folds = result
        .folds
        .iter()
        .map(|f| FoldRecord {
            fold: f.fold,
            params: &f.params,
            inner_score: f.inner_score,
            kappa: f.kappa,
            n_train: f.n_train,
            n_train_resampled: f.n_train_resampled,
            n_test: f.test_indices.len(),
        })
        .collect();

    let macro_avg = result.report.macro_avg();
    let weighted_avg = result.report.weighted_avg();
    let mut report: Vec<ClassRecord<'_>> = result
        .report
        .class_names()
        .iter()
        .zip(result.report.classes())
        .map(|(name, m)| ClassRecord {
            label: name,
            precision: m.precision,
            recall: m.recall,
            f1: m.f1,
            support: m.support,
        })
        .collect();
    for (label, avg) in [("macro avg", macro_avg), ("weighted avg", weighted_avg)] {
        report.push(ClassRecord {
            label,
            precision: avg.precision,
            recall: avg.recall,
            f1: avg.f1,
            support: avg.support,
        });
    }

    let feature_importances = result
        .feature_importances
        .iter()
        .map(|f| FeatureRecord {
            name: &f.name,
            importance: f.importance,
            rank: f.rank,
        })
        .collect();

    let path = writer.write_evaluation(&EvaluationRecord {
        model: result.kind.short_name(),
        inner_scoring: result.scoring.name(),
        n_samples: result.n_samples,
        folds,
        pooled_kappa: result.pooled_kappa,
        mean_kappa: result.mean_kappa,
        std_kappa: result.std_kappa,
        accuracy: result.report.accuracy(),
        confusion_matrix: result.confusion_matrix.as_rows(),
        report,
        feature_importances,
    })?;
    Ok(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let experiment = ExperimentName::new(cli.experiment.clone())?;
    let writer = ResultWriter::new(&cli.output_dir, experiment)?;

    match cli.command {
        Command::Explore { input } => run_explore(&input, &writer)?,

        Command::Evaluate {
            input,
            model,
            outer_folds,
            inner_folds,
            k_neighbors,
            inner_scoring,
        } => {
            let data = load_features(&input)?;
            let smote = Smote::new(k_neighbors)?.with_seed(cli.seed);
            let cv = NestedCrossValidation::new(outer_folds)?
                .with_inner_folds(inner_folds)?
                .with_seed(cli.seed)
                .with_smote(Some(smote))
                .with_scoring(inner_scoring.into());

            let mut pooled: BTreeMap<&str, f64> = BTreeMap::new();
            for kind in model.kinds() {
                let grid = ParamGrid::for_kind(kind, cli.seed)?;
                let result = cv
                    .evaluate(&grid, &data)
                    .with_context(|| format!("{kind} evaluation failed"))?;
                print_evaluation(&result);
                let path = write_evaluation(&writer, &result)?;
                info!(path = %path.display(), model = kind.short_name(), "evaluation written");
                pooled.insert(kind.short_name(), result.pooled_kappa);
            }

            if pooled.len() > 1 {
                println!("Pooled Kappa by model:");
                for (name, kappa) in &pooled {
                    println!("  {name:<4} {kappa:.4}");
                }
            }
        }

        Command::Visualize {
            input,
            test_fraction,
            split_model,
            k_neighbors,
        } => {
            let data = load_features(&input)?;

            let curves = full_data_roc(&data, &ModelKind::ALL, cli.seed).context("ROC computation failed")?;
            println!("ROC AUC (fit and scored on all rows, optimistic):");
            for roc in &curves {
                println!("  {:<20} {:.4}", roc.kind.to_string(), roc.curve.auc);
            }
            let records: Vec<RocRecord<'_>> = curves
                .iter()
                .map(|roc| RocRecord {
                    model: roc.kind.short_name(),
                    fpr: &roc.curve.fpr,
                    tpr: &roc.curve.tpr,
                    thresholds: &roc.curve.thresholds,
                    auc: roc.curve.auc,
                })
                .collect();
            let roc_path = writer.write_roc(&records)?;

            let smote = Smote::new(k_neighbors)?.with_seed(cli.seed);
            let holdout = holdout_confusion(&data, split_model.into(), test_fraction, Some(&smote), cli.seed)
                .context("held-out confusion matrix failed")?;
            let cm = &holdout.confusion_matrix;
            println!();
            println!(
                "{} confusion matrix on {} held-out rows ({:.0}%):",
                holdout.kind,
                holdout.n_test,
                100.0 * test_fraction
            );
            print!("{cm}");
            println!("Accuracy: {:.4}  Kappa: {:.4}", cm.accuracy(), cm.kappa());
            let confusion_path = writer.write_confusion(&ConfusionRecord {
                model: holdout.kind.short_name(),
                class_names: data.class_names(),
                test_fraction,
                n_train: holdout.n_train,
                n_test: holdout.n_test,
                matrix: cm.as_rows(),
                accuracy: cm.accuracy(),
                kappa: cm.kappa(),
            })?;

            println!();
            println!("Wrote {}", roc_path.display());
            println!("Wrote {}", confusion_path.display());
        }
    }

    Ok(())
}
