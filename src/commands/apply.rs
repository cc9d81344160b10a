use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reconcile::{ApplyContext, ConfigWalker, TemplateParams};
use vaultkit::{ClientConfig, HttpBackend};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::paths;
use crate::source::{DocumentSource, FetchOptions};
use crate::ui;

/// Template parameter file read from the document root when no
/// `--template-file` is given
pub const DEFAULT_TEMPLATE_FILE: &str = "_vaultwright.json";

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    if !ctx.quiet {
        ui::header("Applying Vault Configuration");
    }
    if args.dry {
        log::info!("Dry mode enabled, no changes will be made");
        if !ctx.quiet {
            ui::warn("Dry run - no changes will be made");
        }
    }

    let source = DocumentSource::parse(&args.document_path)?;
    preflight(&args)?;
    let backend = connect(&args)?;

    let work_dir = tempfile::Builder::new()
        .prefix("vaultwright-")
        .tempdir()
        .context("Failed to create work directory")?;
    log::debug!("Work directory: {}", work_dir.path().display());

    let opts = FetchOptions {
        http_auth_token: args.http_auth_token.clone(),
        tar_dir: args.tar_dir.clone(),
    };
    let result = source
        .resolve(work_dir.path(), &opts)
        .and_then(|root| apply_root(ctx, &args, backend, &root));

    if args.no_cleanup && source.needs_work_dir() {
        let kept = work_dir.keep();
        ui::dim(&format!("Work directory kept at {}", kept.display()));
    }

    result
}

/// Reject bad local inputs before contacting Vault.
fn preflight(args: &ApplyArgs) -> Result<()> {
    TemplateParams::from_pairs(&args.template_params).context("Invalid --template-params")?;
    if let Some(raw) = args.template_file.as_deref() {
        explicit_template_file(raw)?;
    }
    Ok(())
}

/// Build the Vault client and check the token before touching anything.
fn connect(args: &ApplyArgs) -> Result<HttpBackend> {
    let config = ClientConfig::new(args.vault_addr.clone(), args.vault_token.clone())
        .namespace(args.vault_namespace.clone())
        .skip_verify(args.skip_verify);

    let backend = HttpBackend::new(&config).context("Failed to create Vault client")?;
    if let Err(e) = backend.verify_token() {
        ui::dim(e.category().advice());
        return Err(e).with_context(|| format!("Failed to authenticate to {}", backend.address()));
    }
    log::info!("Connected to Vault at {}", backend.address());
    Ok(backend)
}

fn apply_root(ctx: &Context, args: &ApplyArgs, backend: HttpBackend, root: &Path) -> Result<()> {
    let params = load_params(args, root)?;

    if !ctx.quiet {
        ui::kv("Vault", backend.address());
        ui::kv("Root", &root.display().to_string());
        if !params.is_empty() {
            ui::kv("Parameters", &param_names(&params));
        }
    }

    let mut walker = ConfigWalker::new(Arc::new(backend), root, params)?;
    log::debug!("Dispatch order: {}", walker.dispatch_order().join(", "));

    let report = match walker.run(&ApplyContext::new(args.dry)) {
        Ok(report) => report,
        Err(e) => {
            if let Some(category) = e.remote_category() {
                ui::dim(category.advice());
            }
            return Err(e.into());
        }
    };

    if !ctx.quiet {
        ui::report(&report, args.dry, ctx.verbose > 0);
    }
    Ok(())
}

/// Merge `--template-params` with the parameter file.
///
/// Values from the file win over the command line.
fn load_params(args: &ApplyArgs, root: &Path) -> Result<TemplateParams> {
    let cli = TemplateParams::from_pairs(&args.template_params)
        .context("Invalid --template-params")?;

    let file = match template_file(args.template_file.as_deref(), root)? {
        Some(path) => {
            log::info!("Reading template parameters from {}", path.display());
            TemplateParams::from_file(&path)?
        }
        None => TemplateParams::new(),
    };

    Ok(cli.merged_with(file))
}

fn template_file(explicit: Option<&str>, root: &Path) -> Result<Option<PathBuf>> {
    if let Some(raw) = explicit {
        return explicit_template_file(raw).map(Some);
    }

    let default = root.join(DEFAULT_TEMPLATE_FILE);
    Ok(default.is_file().then_some(default))
}

fn explicit_template_file(raw: &str) -> Result<PathBuf> {
    let path = paths::expand(raw);
    if !path.is_file() {
        bail!("Template file not found: {}", path.display());
    }
    Ok(path)
}

/// Parameter names only; values may be account ids or secrets.
fn param_names(params: &TemplateParams) -> String {
    params.keys().collect::<Vec<_>>().join(", ")
}
