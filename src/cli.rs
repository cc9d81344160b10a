use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "vaultwright")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Apply declarative Vault configuration from a directory tree", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile Vault with a configuration tree
    #[command(after_help = APPLY_NOTES)]
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

const APPLY_NOTES: &str = "\
Notes:
  - This applies whatever configuration it is given without confirmation,
    including removing undeclared policies and auth mounts. Use --dry first.
  - Files whose name starts with an underscore (e.g. _vaultwright.json) are
    never written to Vault.
  - Without --template-file, _vaultwright.json in the document root is used
    when present. Its values take precedence over --template-params.";

#[derive(Args)]
pub struct ApplyArgs {
    /// Configuration root: a local directory, a local .tar.gz, or an
    /// http(s) URL to a .tar.gz
    #[arg(long, value_name = "PATH")]
    pub document_path: String,

    /// Show what would change without writing to Vault
    #[arg(long)]
    pub dry: bool,

    /// JSON file of template parameters
    #[arg(long, value_name = "FILE")]
    pub template_file: Option<String>,

    /// Template parameters, e.g. service=foo,account=bar
    #[arg(long, value_name = "KEY=VALUE", value_delimiter = ',')]
    pub template_params: Vec<String>,

    /// Value sent as the Authorization header when fetching a URL
    #[arg(long, value_name = "TOKEN")]
    pub http_auth_token: Option<String>,

    /// Directory inside the tarball to use as the configuration root
    #[arg(long, value_name = "DIR")]
    pub tar_dir: Option<String>,

    /// Keep the temporary work directory on exit
    #[arg(long)]
    pub no_cleanup: bool,

    /// Vault server address
    #[arg(long, env = "VAULT_ADDR", default_value = vaultkit::DEFAULT_ADDRESS)]
    pub vault_addr: String,

    /// Vault token
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true)]
    pub vault_token: String,

    /// Vault Enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE")]
    pub vault_namespace: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "VAULT_SKIP_VERIFY")]
    pub skip_verify: bool,
}
