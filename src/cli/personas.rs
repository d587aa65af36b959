//! Browse, suggest and activate personas.
//!
//! ```bash
//! ccsetup personas list
//! ccsetup personas info "security engineer"
//! ccsetup personas suggest harden the auth flow before deployment
//! ccsetup personas suggest --command /load-test
//! ccsetup personas activate architect
//! ccsetup personas export > personas.json
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::common::{OutputFormat, print_json, print_success, print_warning, resolve_dir};
use crate::config::ToolConfig;
use crate::personas::{Persona, PersonaManager};

#[derive(Args)]
pub struct PersonaDir {
    /// Project directory (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum PersonasCommand {
    /// List every persona and mark the active one
    List {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        target: PersonaDir,
    },

    /// Show one persona in full
    Info {
        /// Persona id or name
        name: String,

        /// Also print the persona's template
        #[arg(long)]
        template: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        target: PersonaDir,
    },

    /// Suggest personas for a task description or a slash command
    Suggest {
        /// Words describing the task
        #[arg(required_unless_present = "command")]
        context: Vec<String>,

        /// Suggest for a slash command instead
        #[arg(long, conflicts_with = "context")]
        command: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        target: PersonaDir,
    },

    /// Make a persona the active one
    Activate {
        name: String,

        #[command(flatten)]
        target: PersonaDir,
    },

    /// Clear the active persona
    Deactivate {
        #[command(flatten)]
        target: PersonaDir,
    },

    /// Print every persona as JSON, keyed by id
    Export {
        #[command(flatten)]
        target: PersonaDir,
    },
}

impl PersonasCommand {
    const fn target(&self) -> &PersonaDir {
        match self {
            Self::List { target, .. }
            | Self::Info { target, .. }
            | Self::Suggest { target, .. }
            | Self::Activate { target, .. }
            | Self::Deactivate { target }
            | Self::Export { target } => target,
        }
    }

    pub async fn execute(self, config: &ToolConfig) -> Result<()> {
        let dir = resolve_dir(self.target().dir.clone())?;
        let mut manager = PersonaManager::new(&dir, Path::new(&config.templates_dir))?;

        match self {
            Self::List { format, .. } => {
                let personas = manager.list();
                match format {
                    OutputFormat::Json => print_json(&personas)?,
                    OutputFormat::Text => print_personas(&personas, &manager.unrecognized_templates()?, &dir),
                }
            }
            Self::Info { name, template, format, .. } => {
                let persona = manager.get(&name)?;
                match format {
                    OutputFormat::Json => print_json(&persona)?,
                    OutputFormat::Text => print_persona(&persona),
                }
                if template && format == OutputFormat::Text {
                    match manager.template(&name)? {
                        Some(text) => println!("\n{text}"),
                        None => print_warning(&format!("No template found for {}", persona.name)),
                    }
                }
            }
            Self::Suggest { context, command, format, .. } => {
                let (subject, kinds) = match command {
                    Some(command) => {
                        let kinds = manager.suggest_for_command(&command);
                        (command, kinds)
                    }
                    None => {
                        let context = context.join(" ");
                        let kinds = manager.suggest_for_context(&context);
                        (context, kinds)
                    }
                };
                let suggested: Vec<Persona> = kinds.into_iter().map(|kind| manager.persona(kind)).collect();
                match format {
                    OutputFormat::Json => print_json(&suggested)?,
                    OutputFormat::Text => print_suggestions(&subject, &suggested),
                }
            }
            Self::Activate { name, .. } => {
                let previous = manager.activate(&name)?;
                if let Some(previous) = previous {
                    println!("Deactivated {}", previous.display_name());
                }
                if let Some(persona) = manager.active() {
                    print_success(&format!("Activated {} persona", persona.name.bold()));
                    println!("  Focus: {}", persona.description);
                    println!("  Key areas: {}", join_first(persona.focus_areas, 4));
                }
            }
            Self::Deactivate { .. } => match manager.deactivate()? {
                Some(kind) => print_success(&format!("Deactivated {} persona", kind.display_name())),
                None => println!("No persona is currently active"),
            },
            Self::Export { .. } => print_json(&manager.export())?,
        }
        Ok(())
    }
}

fn join_first(items: &[&str], n: usize) -> String {
    items.iter().take(n).copied().collect::<Vec<_>>().join(", ")
}

fn print_personas(personas: &[Persona], unrecognized: &[PathBuf], dir: &Path) {
    for persona in personas {
        let status = if persona.is_active { "● active".green() } else { "○".dimmed() };
        println!("{status} {} ({})", persona.name.bold(), persona.kind);
        println!("    {}", persona.description);
        println!("    Specializations: {}", join_first(persona.command_specializations, 3).dimmed());
    }

    match personas.iter().find(|p| p.is_active) {
        Some(active) => println!("\nCurrently active: {}", active.name.bold()),
        None => println!("\nNo persona currently active"),
    }

    for path in unrecognized {
        let shown = path.strip_prefix(dir).unwrap_or(path);
        print_warning(&format!("{} does not match a known persona", shown.display()));
    }
}

fn print_persona(persona: &Persona) {
    println!("{}", format!("{} Persona", persona.name).bold());
    println!("{}", persona.description);
    if persona.is_active {
        println!("{}", "Currently active".green());
    }

    let sections: [(&str, &[&str]); 4] = [
        ("Focus areas", persona.focus_areas),
        ("Responsibilities", persona.responsibilities),
        ("Command specializations", persona.command_specializations),
        ("Activation triggers", persona.activation_triggers),
    ];
    for (title, items) in sections {
        println!("\n{title}:");
        for item in items {
            println!("  • {item}");
        }
    }

    if let Some(path) = &persona.template_path {
        println!("\nTemplate: {}", path.display());
    }
}

fn print_suggestions(subject: &str, suggested: &[Persona]) {
    if suggested.is_empty() {
        println!("No persona suggestions for '{subject}'");
        return;
    }
    println!("Suggested personas for '{subject}':");
    for persona in suggested {
        println!("  • {} - {}", persona.name.bold(), persona.description);
    }
    if let [only] = suggested {
        println!("\nRun 'ccsetup personas activate {}' to use it", only.kind);
    }
}
