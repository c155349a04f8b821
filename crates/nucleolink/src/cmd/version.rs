use serde::Serialize;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct VersionOutput {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    features: Option<Vec<&'static str>>,
}

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    let output = VersionOutput {
        name: "nucleolink",
        version: env!("CARGO_PKG_VERSION"),
        target: args
            .extended
            .then(|| option_env!("NUCLEOLINK_BUILD_TARGET").unwrap_or("unknown")),
        profile: args
            .extended
            .then(|| option_env!("NUCLEOLINK_BUILD_PROFILE").unwrap_or("unknown")),
        features: args.extended.then(active_features),
    };

    if format == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string(&output).unwrap_or_else(|_| "{}".to_string())
        );
        return Ok(SUCCESS);
    }

    println!("{} {}", output.name, output.version);
    if let (Some(target), Some(profile), Some(features)) =
        (output.target, output.profile, &output.features)
    {
        println!("target: {target}");
        println!("profile: {profile}");
        println!("os: {}", std::env::consts::OS);
        println!("features: {}", features.join(", "));
    }
    Ok(SUCCESS)
}

fn active_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "session") {
        features.push("session");
    }
    if cfg!(feature = "cli") {
        features.push("cli");
    }
    features
}
