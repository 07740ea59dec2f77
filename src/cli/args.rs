//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint};

use crate::domain::{DebugFeature, Symptom, SystemHistory};

/// Interactive no-power / no-POST troubleshooting wizard
#[derive(Parser, Debug)]
#[command(name = "postwiz")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Decision tree file (default: configured tree_path or built-in tree)
    #[arg(long, global = true, value_hint = ValueHint::FilePath, env = "POSTWIZ_TREE")]
    pub tree: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the intake questionnaire and start a diagnosis
    Run {
        /// Skip the intake and start at this node
        #[arg(long)]
        entry: Option<String>,
    },

    /// Continue a diagnosis from a resume code or saved report
    Resume {
        /// Resume code (prompted for when neither CODE nor --file is given)
        code: Option<String>,
        /// Read the code or a saved report from a file
        #[arg(short, long, value_hint = ValueHint::FilePath, conflicts_with = "code")]
        file: Option<PathBuf>,
        /// Replace the checklist instead of adding the saved steps
        #[arg(long)]
        replace_checklist: bool,
    },

    /// Print the entry node chosen for a set of intake answers
    Classify {
        /// Observed symptom (repeatable)
        #[arg(short, long, value_enum, required = true)]
        symptom: Vec<SymptomArg>,
        /// Debug feature on the motherboard
        #[arg(long, value_enum)]
        debug_feature: Option<DebugFeatureArg>,
        /// System history
        #[arg(long, value_enum)]
        history: Option<HistoryArg>,
    },

    /// Decode a resume code and print its report
    Inspect {
        /// Resume code
        code: Option<String>,
        /// Read the code or a saved report from a file
        #[arg(short, long, value_hint = ValueHint::FilePath, conflicts_with = "code")]
        file: Option<PathBuf>,
    },

    /// Check the decision tree for integrity problems
    Validate,

    /// Show the decision graph as a tree
    Tree {
        /// Start node (default: every routing entry)
        #[arg(long)]
        from: Option<String>,
    },

    /// Show one node (fuzzy-select when no ID is given)
    Show {
        /// Node id
        id: Option<String>,
    },

    /// List the checklist catalog by category
    Checklist,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Print a configuration template
    Template,
    /// Show config file locations
    Path,
}

/// Symptom names accepted by `classify`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymptomArg {
    NoPower,
    InstantShutdown,
    PowerCycles,
    FansNoDisplay,
    BootsDisplay,
    FansMax,
    BeepCodes,
}

impl From<SymptomArg> for Symptom {
    fn from(arg: SymptomArg) -> Self {
        match arg {
            SymptomArg::NoPower => Symptom::NoPower,
            SymptomArg::InstantShutdown => Symptom::InstantShutdown,
            SymptomArg::PowerCycles => Symptom::PowerCycles,
            SymptomArg::FansNoDisplay => Symptom::FansNoDisplay,
            SymptomArg::BootsDisplay => Symptom::BootsDisplay,
            SymptomArg::FansMax => Symptom::FansMax,
            SymptomArg::BeepCodes => Symptom::BeepCodes,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugFeatureArg {
    None,
    Beep,
    Leds,
    Codes,
}

impl From<DebugFeatureArg> for DebugFeature {
    fn from(arg: DebugFeatureArg) -> Self {
        match arg {
            DebugFeatureArg::None => DebugFeature::None,
            DebugFeatureArg::Beep => DebugFeature::Beep,
            DebugFeatureArg::Leds => DebugFeature::Leds,
            DebugFeatureArg::Codes => DebugFeature::Codes,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryArg {
    NewBuild,
    HardwareChange,
    WasWorking,
}

impl From<HistoryArg> for SystemHistory {
    fn from(arg: HistoryArg) -> Self {
        match arg {
            HistoryArg::NewBuild => SystemHistory::NewBuild,
            HistoryArg::HardwareChange => SystemHistory::HardwareChange,
            HistoryArg::WasWorking => SystemHistory::WasWorking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_classify_args_when_parsing_then_maps_to_domain_values() {
        let cli = Cli::try_parse_from([
            "postwiz",
            "classify",
            "-s",
            "fans-no-display",
            "--symptom",
            "power-cycles",
            "--debug-feature",
            "leds",
            "--history",
            "new-build",
        ])
        .unwrap();

        let Some(Commands::Classify {
            symptom,
            debug_feature,
            history,
        }) = cli.command
        else {
            panic!("expected classify, got {:?}", cli.command);
        };
        let symptoms: Vec<Symptom> = symptom.into_iter().map(Symptom::from).collect();
        assert_eq!(symptoms, vec![Symptom::FansNoDisplay, Symptom::PowerCycles]);
        assert_eq!(debug_feature.map(DebugFeature::from), Some(DebugFeature::Leds));
        assert_eq!(history.map(SystemHistory::from), Some(SystemHistory::NewBuild));
    }

    #[test]
    fn given_unknown_symptom_when_parsing_then_rejected() {
        assert!(Cli::try_parse_from(["postwiz", "classify", "-s", "smoke"]).is_err());
    }
}
