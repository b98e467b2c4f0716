use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use lumi_mapper::driver::traits::Navigate;
use lumi_mapper::driver::web::{BrowserChoice, WebDriver};
use lumi_mapper::mapper::Mapper;
use lumi_mapper::shell::{describe_verdict, Shell};
use lumi_mapper::storage::RecordStore;
use lumi_mapper::utils::audit::AuditLog;
use lumi_mapper::utils::config::Config;
use lumi_mapper::utils::identity;

#[derive(Parser)]
#[command(name = "lumi-mapper")]
#[command(author = "NL Team")]
#[command(version = "0.1.3")]
#[command(about = "Interactive web element mapper", long_about = None)]
struct Cli {
    /// Browser to drive (edge, chrome, chromium)
    #[arg(short, long, global = true, default_value = "edge")]
    browser: String,

    /// Run without a visible window (also LUMI_HEADLESS=1)
    #[arg(long, global = true, default_value = "false")]
    headless: bool,

    /// Directory for captured element records
    #[arg(long, global = true, default_value = "./JSONs")]
    json_dir: PathBuf,

    /// Directory for session audit logs
    #[arg(long, global = true, default_value = "./logs")]
    log_dir: PathBuf,

    /// Attach to a running browser over CDP (also LUMI_CDP_ENDPOINT)
    #[arg(long, global = true)]
    cdp_endpoint: Option<String>,

    /// Page to open on start
    #[arg(short, long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-locate a saved element and report which strategy found it
    Test {
        /// Record file name or path
        file: String,
    },

    /// Print a saved record without opening a browser
    Show {
        /// Record file name or path
        file: String,
    },
}

impl Cli {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::default();
        config.json_dir = self.json_dir.clone();
        config.log_dir = self.log_dir.clone();
        config.web.browser = self.browser.parse::<BrowserChoice>()?;
        config.web.headless |= self.headless;
        if self.cdp_endpoint.is_some() {
            config.web.cdp_endpoint = self.cdp_endpoint.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let store = RecordStore::new(&config.json_dir);

    match cli.command {
        Some(Commands::Show { ref file }) => {
            let record = store.load(file)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }

        Some(Commands::Test { ref file }) => {
            let record = store.load(file)?;
            let session = identity::new_session_id();
            let mut audit = AuditLog::create(&config.log_dir, &session)?;
            audit.info(&format!("test {} (browser: {})", file, config.web.browser));

            let driver = WebDriver::new(config.web.clone()).await?;
            let target = cli.url.clone().unwrap_or_else(|| record.page_url.clone());
            if !target.is_empty() {
                let opened = driver.open(&target).await?;
                audit.info(&format!("open {}", opened));
            }

            let mut mapper = Mapper::new(driver);
            let result = mapper.test(&record).await.context("Revalidation failed")?;
            for w in &result.warnings {
                audit.warn(&w.to_string());
            }
            let verdict = describe_verdict(file, &result);
            if !result.located {
                audit.error(&verdict);
                anyhow::bail!("Element not located");
            }
            audit.success(&verdict);
        }

        None => {
            let session = identity::new_session_id();
            let mut audit = AuditLog::create(&config.log_dir, &session)?;
            audit.info(&format!(
                "session start (user: {}, host: {}, session: {})",
                identity::machine_user(),
                identity::machine_host(),
                session
            ));
            audit.info(&format!(
                "browser: {}, headless: {}, records: {}",
                config.web.browser,
                config.web.headless,
                config.json_dir.display()
            ));
            println!("  Audit log: {}", audit.path().display().to_string().cyan());

            let driver = WebDriver::new(config.web.clone()).await?;
            if let Some(ref url) = cli.url {
                let opened = driver.open(url).await?;
                audit.success(&format!("open {}", opened));
            }

            let mut shell = Shell::new(driver, store, audit, session);
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            shell.run(&mut input).await?;
        }
    }

    Ok(())
}
