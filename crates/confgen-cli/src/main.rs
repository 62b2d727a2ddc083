use clap::Parser;
use confgen_build::{BuildConfig, CCompiler, CompileCommands, DiskLoader, PreprocessConfig};
use confgen_common::{Reporter, Verbosity};
use confgen_driver::{Driver, DriverSettings};
use miette::Result;
use std::path::Path;

#[derive(Parser)]
#[command(name = "confgen")]
#[command(
    author,
    version,
    about = "Resolve an autotools-style configure descriptor into preprocessor definitions and DCE stubs"
)]
struct Cli {
    /// Location of the source configure file [auto-detected]
    #[arg(long, value_name = "DIR")]
    rootdir: Option<String>,

    /// Location of generated output files [ROOT/SMP]
    #[arg(long, value_name = "DIR")]
    projdir: Option<String>,

    /// Install prefix probed for auto-detected libraries
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Project configuration file
    #[arg(long, value_name = "FILE", default_value = "confgen.toml")]
    config: String,

    /// Only generate missing DCE files, no configuration headers
    #[arg(long)]
    dce_only: bool,

    /// Use yasm instead of the default nasm
    #[arg(long)]
    use_yasm: bool,

    /// Re-use an existing config.h found in rootdir
    #[arg(long)]
    use_existing_config: bool,

    /// Only print errors
    #[arg(long, conflicts_with = "loud")]
    quiet: bool,

    /// Print per-option informational output
    #[arg(long)]
    loud: bool,

    /// Enable/disable directives (--enable-NAME, --disable-NAME,
    /// --enable-NAME=VALUE, --list-KIND)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    directives: Vec<String>,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        Verbosity::Error
    } else if cli.loud {
        Verbosity::Info
    } else {
        Verbosity::Warning
    };
    let reporter = Reporter::new(verbosity);

    let config = if Path::new(&cli.config).is_file() {
        BuildConfig::from_file(Path::new(&cli.config))
            .map_err(|e| miette::miette!("Failed to read {}: {}", cli.config, e))?
    } else {
        BuildConfig::default()
    };

    let mut include_dirs = Vec::new();
    if let Some(db_path) = &config.compiler.compile_commands {
        let db = CompileCommands::from_file(Path::new(db_path))
            .map_err(|e| miette::miette!("Failed to read {}: {}", db_path, e))?;
        include_dirs = db.include_dirs();
    }

    let settings = DriverSettings {
        root_dir: cli.rootdir.or(config.project.root),
        out_dir: cli.projdir.or(config.project.out),
        prefix: cli.prefix.or(config.project.prefix),
        dce_only: cli.dce_only,
        use_nasm: !cli.use_yasm,
        use_existing_config: cli.use_existing_config,
        include_dirs,
        temp_dir: config
            .project
            .temp
            .unwrap_or_else(|| DriverSettings::default().temp_dir),
    };

    let mut preprocess = PreprocessConfig::new();
    if let Some(compiler) = &config.compiler.path {
        preprocess = preprocess.compiler(compiler);
    }
    for arg in &config.compiler.args {
        preprocess = preprocess.arg(arg);
    }
    let compiler = CCompiler::new(preprocess);

    let loader = DiskLoader::new();
    let driver = Driver::new(&loader, &compiler, reporter, settings);

    // A list request prints and exits without generating anything.
    let lists: Vec<&String> = cli
        .directives
        .iter()
        .filter(|d| d.starts_with("--list-"))
        .collect();
    if !lists.is_empty() {
        for request in lists {
            let kind = &request["--list-".len()..];
            println!("{}: ", kind);
            for member in driver.list(kind)? {
                println!("  {}", member);
            }
        }
        return Ok(());
    }

    driver.run(&cli.directives)
}
