use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Result, WrapErr};
use frameval::{
    builder::EvaluatorBuilder,
    evaluator::{
        error::EvaluateError,
        formatter::{
            BasicErrorFormatter, DebugFormatter, ErrorFormatter, EvaluatorFormatter,
            PrettyErrorFormatter, SExpressionFormatter,
        },
        ExpressionEvaluator,
    },
    scenario::Scenario,
    value::formatter::{TypedFormatter, ValueFormatter},
};
use std::path::{Path, PathBuf};
use std::{fs::read_to_string, process::ExitCode};

const BUILD_FAILURE: u8 = 65;
const EVALUATION_FAILURE: u8 = 70;

#[derive(Debug, Parser)]
#[clap(name = "frameval", version)]
pub struct CLArgs {
    #[clap(subcommand)]
    pub routine: FramevalCommand,
    /// Log builder and evaluator activity to stderr.
    #[clap(long, global = true)]
    pub verbose: bool,
    /// Compile against this class instead of the scenario's own context class.
    #[clap(long = "context-class", global = true)]
    pub context_class: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum FramevalCommand {
    Compile {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "sexpr")]
        format: TreeFormat,
    },
    Run {
        path: PathBuf,
        #[clap(long = "format", value_enum, default_value = "basic")]
        format: ErrorFormat,
    },
}

#[derive(Debug, Clone, ValueEnum)]
pub enum TreeFormat {
    Debug,
    #[clap(name = "sexpr")]
    SExpr,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ErrorFormat {
    Basic,
    Pretty,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let args = CLArgs::parse();
    init_logging(args.verbose)?;

    match args.routine {
        FramevalCommand::Compile { path, format } => {
            eprintln!("Compiling {:?}...", path);
            let scenario = load(&path, args.context_class.as_deref())?;
            match build(&scenario) {
                Ok(tree) => {
                    let formatter: Box<dyn EvaluatorFormatter> = match format {
                        TreeFormat::Debug => Box::new(DebugFormatter),
                        TreeFormat::SExpr => Box::new(SExpressionFormatter),
                    };
                    println!("{}", formatter.format(&tree));
                }
                Err(error) => {
                    report(&scenario, &path, &ErrorFormat::Basic, &error);
                    return Ok(ExitCode::from(BUILD_FAILURE));
                }
            }
        }
        FramevalCommand::Run { path, format } => {
            eprintln!("Running {:?}...", path);
            let scenario = load(&path, args.context_class.as_deref())?;
            let tree = match build(&scenario) {
                Ok(tree) => tree,
                Err(error) => {
                    report(&scenario, &path, &format, &error);
                    return Ok(ExitCode::from(BUILD_FAILURE));
                }
            };
            let mut sandbox = scenario
                .sandbox()
                .wrap_err("Failed to set up the debuggee")?;
            match tree.evaluate(&mut sandbox) {
                Ok(result) => {
                    println!("{}", TypedFormatter.format(result.value()));
                    if let Some(modifier) = result.modifier() {
                        println!("modifiable: {}", modifier.descriptor());
                    }
                    for (name, value) in sandbox.locals() {
                        println!("{name} = {}", TypedFormatter.format(value));
                    }
                }
                Err(error) => {
                    report(&scenario, &path, &format, &error);
                    return Ok(ExitCode::from(EVALUATION_FAILURE));
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| eyre!(error))
}

fn load(path: &Path, context_class: Option<&str>) -> Result<Scenario> {
    let src = read_to_string(path).wrap_err_with(|| format!("Cannot read {path:?}"))?;
    let mut scenario = Scenario::from_json(&src)?;
    if let Some(name) = context_class {
        let class = scenario
            .classes
            .find(name)
            .ok_or_else(|| eyre!("Unknown context class `{name}`"))?;
        scenario.context_class = Some(class);
        scenario.fragment.context_class = Some(class);
    }
    Ok(scenario)
}

fn build(scenario: &Scenario) -> Result<ExpressionEvaluator, EvaluateError> {
    let mut builder = EvaluatorBuilder::new(&scenario.classes);
    if let Some(class) = scenario.context_class {
        builder = builder.with_context_class(class);
    }
    if let Some(position) = scenario.position {
        builder = builder.with_position(position);
    }
    builder.build_fragment(&scenario.fragment)
}

fn report(scenario: &Scenario, path: &Path, format: &ErrorFormat, error: &EvaluateError) {
    let text = scenario.fragment.text.as_str();
    let formatter: Box<dyn ErrorFormatter + '_> = match format {
        ErrorFormat::Basic => Box::new(BasicErrorFormatter::new(text)),
        ErrorFormat::Pretty => Box::new(PrettyErrorFormatter::new(text, path)),
    };
    eprintln!("{}", formatter.format_error(error));
}
