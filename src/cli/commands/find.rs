//! # Find Command Module / 发现命令模块
//!
//! Discovers the cases of one assembly and prints them, optionally with the
//! tokens a later `run --token` accepts.
//!
//! 发现单个程序集中的用例并打印，可选地附带之后 `run --token` 可接受的令牌。

use anyhow::Result;
use clap::ArgMatches;
use tracing::info;

use super::{
    GlobalOptions, build_controller, discovery_options, finish_reporting, project_from,
    spawn_reporter,
};
use crate::core::{bus::EventKind, config::FindSettings, MessageBus};

pub async fn execute(global: &GlobalOptions, matches: &ArgMatches) -> Result<()> {
    let project = project_from(matches, &global.config)?;
    let settings = FindSettings::new(discovery_options(matches, &global.config));
    let controller = build_controller(&project, &global.language)?;

    let bus = MessageBus::new();
    let reporter = spawn_reporter(
        &bus,
        EventKind::DiscoveryComplete,
        global,
        matches.get_flag("show-tokens"),
    );

    let outcome = controller.find(&bus, &settings);
    let cases = finish_reporting(bus, reporter, outcome).await?;
    info!(assembly = controller.assembly_name(), cases = cases.len(), "discovery finished");
    Ok(())
}
