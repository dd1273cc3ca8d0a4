//! `playground plugin` subcommands.
//!
//! ## Commands
//!
//! - `playground plugin record <PLUGIN> --installer <helm|argocd>`
//! - `playground plugin installer <PLUGIN> [--json]`
//! - `playground plugin list --installer <helm|argocd> [--json]`
//! - `playground plugin tracked [--json]`
//! - `playground plugin forget <PLUGIN>`

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use playground_tracker::{DocumentClient, InstallerTracker, InstallerType};
use serde_json::json;

use crate::console::Console;

/// Plugin installer bookkeeping.
#[derive(Debug, Parser)]
pub struct PluginCli {
    #[command(subcommand)]
    pub command: PluginSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum PluginSubcommand {
    /// Record which installer manages a plugin.
    Record(RecordArgs),
    /// Show the installer recorded for a plugin.
    Installer(InstallerArgs),
    /// List plugins managed by one installer.
    List(ListArgs),
    /// Show every tracked plugin and its installer.
    Tracked(TrackedArgs),
    /// Drop the record for a plugin.
    Forget(ForgetArgs),
}

#[derive(Debug, Parser)]
pub struct RecordArgs {
    /// Plugin name.
    pub plugin: String,

    /// Installer that manages the plugin: helm or argocd.
    #[arg(long = "installer", short = 'i')]
    pub installer: InstallerType,
}

#[derive(Debug, Parser)]
pub struct InstallerArgs {
    /// Plugin name.
    pub plugin: String,

    /// Output as JSON.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ListArgs {
    /// Installer to filter by: helm or argocd.
    #[arg(long = "installer", short = 'i')]
    pub installer: InstallerType,

    /// Output as JSON.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct TrackedArgs {
    /// Output as JSON.
    #[arg(long = "json", short = 'j')]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ForgetArgs {
    /// Plugin name.
    pub plugin: String,
}

impl PluginCli {
    pub async fn run<C: DocumentClient>(
        &self,
        tracker: &InstallerTracker<C>,
        console: &Console,
    ) -> anyhow::Result<()> {
        match &self.command {
            PluginSubcommand::Record(args) => cmd_record(tracker, console, args).await,
            PluginSubcommand::Installer(args) => cmd_installer(tracker, console, args).await,
            PluginSubcommand::List(args) => cmd_list(tracker, console, args).await,
            PluginSubcommand::Tracked(args) => cmd_tracked(tracker, console, args).await,
            PluginSubcommand::Forget(args) => cmd_forget(tracker, console, args).await,
        }
    }
}

async fn cmd_record<C: DocumentClient>(
    tracker: &InstallerTracker<C>,
    console: &Console,
    args: &RecordArgs,
) -> anyhow::Result<()> {
    tracker
        .record(&args.plugin, args.installer)
        .await
        .with_context(|| format!("could not record installer for '{}'", args.plugin))?;
    console.success(format!(
        "Recorded {} as installed by {}",
        args.plugin, args.installer
    ));
    Ok(())
}

async fn cmd_installer<C: DocumentClient>(
    tracker: &InstallerTracker<C>,
    console: &Console,
    args: &InstallerArgs,
) -> anyhow::Result<()> {
    let installer = tracker.get_installer(&args.plugin).await?;

    if args.json {
        let value = json!({
            "plugin": args.plugin,
            "installer": installer.map(InstallerType::as_str),
        });
        console.print(serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    match installer {
        Some(installer) => console.print(installer.as_str()),
        None => console.info(format!("{} is not tracked", args.plugin)),
    }
    Ok(())
}

async fn cmd_list<C: DocumentClient>(
    tracker: &InstallerTracker<C>,
    console: &Console,
    args: &ListArgs,
) -> anyhow::Result<()> {
    let plugins = tracker.list_by_installer(args.installer).await?;

    if args.json {
        let value = json!({
            "installer": args.installer.as_str(),
            "plugins": plugins,
        });
        console.print(serde_json::to_string_pretty(&value)?);
        return Ok(());
    }
    if plugins.is_empty() {
        console.info(format!("No plugins installed by {}", args.installer));
    }
    for plugin in &plugins {
        console.print(plugin);
    }
    Ok(())
}

async fn cmd_tracked<C: DocumentClient>(
    tracker: &InstallerTracker<C>,
    console: &Console,
    args: &TrackedArgs,
) -> anyhow::Result<()> {
    let entries = tracker.entries().await?;

    if args.json {
        console.print(serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        console.info("No plugins are tracked");
        return Ok(());
    }
    let width = entries
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max("PLUGIN".len());
    console.print(format!("{:<width$}  INSTALLER", "PLUGIN"));
    for (plugin, installer) in &entries {
        if InstallerType::from_stored(installer).is_none() {
            console.warn(format!("{plugin} has unrecognized installer '{installer}'"));
        }
        console.print(format!("{plugin:<width$}  {installer}"));
    }
    Ok(())
}

async fn cmd_forget<C: DocumentClient>(
    tracker: &InstallerTracker<C>,
    console: &Console,
    args: &ForgetArgs,
) -> anyhow::Result<()> {
    tracker
        .remove(&args.plugin)
        .await
        .with_context(|| format!("could not forget '{}'", args.plugin))?;
    console.success(format!("Forgot installer record for {}", args.plugin));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{CapturedOutput, LogConfig, Verbosity};
    use playground_tracker::memory::MemoryDocumentClient;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    struct Harness {
        tracker: InstallerTracker<MemoryDocumentClient>,
        console: Console,
        stdout: CapturedOutput,
        stderr: CapturedOutput,
    }

    fn harness() -> Harness {
        let (config, stdout, stderr) = LogConfig::captured(Verbosity::Normal);
        Harness {
            tracker: InstallerTracker::new(MemoryDocumentClient::new()),
            console: Console::new(&config),
            stdout,
            stderr,
        }
    }

    async fn run(h: &Harness, args: &[&str]) -> anyhow::Result<()> {
        let argv = std::iter::once("plugin").chain(args.iter().copied());
        let cli = PluginCli::try_parse_from(argv)?;
        cli.run(&h.tracker, &h.console).await
    }

    #[tokio::test]
    async fn record_then_query() {
        let h = harness();

        run(&h, &["record", "cert-manager", "--installer", "helm"])
            .await
            .unwrap();
        run(&h, &["installer", "cert-manager"]).await.unwrap();

        assert_eq!(h.stdout.contents(), "helm\n");
        assert_eq!(
            h.stderr.contents(),
            "ok: Recorded cert-manager as installed by helm\n"
        );
    }

    #[tokio::test]
    async fn installer_json_reports_null_for_untracked() {
        let h = harness();

        run(&h, &["installer", "ghost", "--json"]).await.unwrap();

        let value: Value = serde_json::from_str(&h.stdout.contents()).unwrap();
        assert_eq!(value, json!({ "plugin": "ghost", "installer": null }));
    }

    #[tokio::test]
    async fn list_prints_sorted_plugins_for_one_installer() {
        let h = harness();
        h.tracker.client().seed([
            ("zeta", "argocd"),
            ("alpha", "argocd"),
            ("cert-manager", "helm"),
        ]);

        run(&h, &["list", "--installer", "argocd"]).await.unwrap();
        run(&h, &["list", "--installer", "argocd", "--json"])
            .await
            .unwrap();

        let out = h.stdout.contents();
        let (plain, json_text) = out.split_at("alpha\nzeta\n".len());
        assert_eq!(plain, "alpha\nzeta\n");
        let value: Value = serde_json::from_str(json_text).unwrap();
        assert_eq!(
            value,
            json!({ "installer": "argocd", "plugins": ["alpha", "zeta"] })
        );
    }

    #[tokio::test]
    async fn list_with_no_matches_says_so() {
        let h = harness();

        run(&h, &["list", "--installer", "helm"]).await.unwrap();

        assert_eq!(h.stdout.contents(), "");
        assert_eq!(h.stderr.contents(), "info: No plugins installed by helm\n");
    }

    #[tokio::test]
    async fn tracked_renders_aligned_table_and_flags_unknown_values() {
        let h = harness();
        h.tracker
            .client()
            .seed([("cert-manager", "helm"), ("odd", "kustomize")]);

        run(&h, &["tracked"]).await.unwrap();

        assert_eq!(
            h.stdout.contents(),
            "PLUGIN        INSTALLER\ncert-manager  helm\nodd           kustomize\n"
        );
        assert_eq!(
            h.stderr.contents(),
            "warning: odd has unrecognized installer 'kustomize'\n"
        );
    }

    #[tokio::test]
    async fn tracked_flags_values_that_differ_from_stored_form() {
        let h = harness();
        h.tracker.client().seed([("x", "Helm"), ("y", "argo-cd")]);

        run(&h, &["tracked"]).await.unwrap();

        assert_eq!(
            h.stderr.contents(),
            "warning: x has unrecognized installer 'Helm'\n\
             warning: y has unrecognized installer 'argo-cd'\n"
        );
    }

    #[tokio::test]
    async fn forget_removes_the_record() {
        let h = harness();
        h.tracker.client().seed([("cert-manager", "helm")]);

        run(&h, &["forget", "cert-manager"]).await.unwrap();

        assert_eq!(h.tracker.get_installer("cert-manager").await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_plugin_name_surfaces_with_context() {
        let h = harness();

        let err = run(&h, &["record", "bad/name", "--installer", "helm"])
            .await
            .unwrap_err();

        let rendered = format!("{err:#}");
        assert!(
            rendered.starts_with("could not record installer for 'bad/name': invalid plugin name"),
            "{rendered}"
        );
    }

    #[test]
    fn unknown_installer_is_a_usage_error() {
        let err = PluginCli::try_parse_from(["plugin", "record", "x", "--installer", "kustomize"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
