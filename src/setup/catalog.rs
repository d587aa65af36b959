//! Frameworks, deployment choices and the built-in MCP server catalogue.

use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

use crate::core::CcsetupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framework {
    Core,
    Fastapi,
    Django,
    Flask,
    DataScience,
    CliTool,
    WebScraping,
}

impl Framework {
    pub const ALL: [Self; 7] = [
        Self::Core,
        Self::Fastapi,
        Self::Django,
        Self::Flask,
        Self::DataScience,
        Self::CliTool,
        Self::WebScraping,
    ];

    /// Identifier used on the command line and in `.metadata.json`.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Fastapi => "fastapi",
            Self::Django => "django",
            Self::Flask => "flask",
            Self::DataScience => "data-science",
            Self::CliTool => "cli-tool",
            Self::WebScraping => "web-scraping",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Core => "Core Python",
            Self::Fastapi => "FastAPI",
            Self::Django => "Django",
            Self::Flask => "Flask",
            Self::DataScience => "Data Science",
            Self::CliTool => "CLI Tool",
            Self::WebScraping => "Web Scraping",
        }
    }

    #[must_use]
    pub const fn tech_stack(self) -> &'static [&'static str] {
        match self {
            Self::Core => &["Python", "pytest", "Black", "mypy", "setuptools/Poetry"],
            Self::Fastapi => &["FastAPI", "Uvicorn", "SQLAlchemy", "Alembic", "Pydantic"],
            Self::Django => &["Django", "Django ORM", "Templates", "Admin", "Forms"],
            Self::Flask => &["Flask", "Jinja2", "SQLAlchemy", "Flask-WTF", "Blueprints"],
            Self::DataScience => &["Pandas", "NumPy", "Scikit-learn", "Jupyter", "MLflow"],
            Self::CliTool => &["Click", "Typer", "Rich", "PyInstaller", "ConfigArgParse"],
            Self::WebScraping => &["Requests", "BeautifulSoup", "Scrapy", "Selenium", "Playwright"],
        }
    }

    #[must_use]
    pub const fn recommended_servers(self) -> &'static [&'static str] {
        match self {
            Self::Fastapi | Self::Django => &["postgresql", "filesystem", "context7", "puppeteer", "magic"],
            Self::Flask => &["sqlite", "filesystem", "context7", "puppeteer", "magic"],
            Self::Core | Self::DataScience | Self::CliTool | Self::WebScraping => {
                &["filesystem", "context7", "puppeteer", "magic"]
            }
        }
    }

    /// The database a fresh project of this kind starts with.
    #[must_use]
    pub const fn default_database(self) -> Database {
        match self {
            Self::Fastapi | Self::Django => Database::Postgresql,
            Self::Flask => Database::Sqlite,
            Self::Core | Self::DataScience | Self::CliTool | Self::WebScraping => Database::None,
        }
    }

    /// Tool permissions granted beyond the common set.
    const fn extra_permissions(self) -> &'static [&'static str] {
        match self {
            Self::Core | Self::CliTool => &["Bash(pytest:*)", "Bash(mypy:*)"],
            Self::Fastapi => &["Bash(pytest:*)", "Bash(uvicorn:*)", "Bash(alembic:*)"],
            Self::Django => &["Bash(pytest:*)", "Bash(python manage.py:*)"],
            Self::Flask => &["Bash(pytest:*)", "Bash(flask:*)"],
            Self::DataScience => &["Bash(jupyter:*)", "Bash(pytest:*)"],
            Self::WebScraping => &["Bash(scrapy:*)", "Bash(pytest:*)"],
        }
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Framework {
    type Err = CcsetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|f| f.id() == normalized)
            .ok_or_else(|| CcsetupError::UnknownFramework { name: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Solo,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Postgresql,
    Mysql,
    Sqlite,
    None,
}

impl Database {
    /// Name of the catalogue server that talks to this database.
    #[must_use]
    pub const fn server(self) -> Option<&'static str> {
        match self {
            Self::Postgresql => Some("postgresql"),
            Self::Mysql => Some("mysql"),
            Self::Sqlite => Some("sqlite"),
            Self::None => None,
        }
    }

    fn connection_string(self, project_name: &str) -> Option<String> {
        match self {
            Self::Postgresql => Some(format!("postgresql://localhost/{project_name}")),
            Self::Mysql => Some(format!("mysql://localhost/{project_name}")),
            Self::Sqlite => Some(format!("./{project_name}.db")),
            Self::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn debug_flag(self) -> &'static str {
        match self {
            Self::Development => "True",
            Self::Staging | Self::Production => "False",
        }
    }
}

/// Every server the catalogue knows how to configure.
pub const SERVER_NAMES: &[&str] = &[
    "postgresql",
    "mysql",
    "sqlite",
    "filesystem",
    "context7",
    "puppeteer",
    "magic",
    "brave-search",
];

/// `.mcp.json` entry for a catalogue server, or `None` for unknown names.
#[must_use]
pub fn server_config(name: &str) -> Option<Value> {
    let package_args: &[&str] = match name {
        "postgresql" => &["@modelcontextprotocol/server-postgres", "postgresql://localhost/mydb"],
        "mysql" => &["@modelcontextprotocol/server-mysql", "mysql://localhost/mydb"],
        "sqlite" => &["@modelcontextprotocol/server-sqlite", "./database.db"],
        "filesystem" => &["@modelcontextprotocol/server-filesystem", "."],
        "context7" => &["@upstash/context7-mcp"],
        "puppeteer" => &["puppeteer-mcp-server"],
        "magic" => &["@magicuidesign/mcp@latest"],
        "brave-search" => &["@modelcontextprotocol/server-brave-search"],
        _ => return None,
    };

    let mut args = vec!["-y"];
    args.extend_from_slice(package_args);
    let mut config = json!({ "command": "npx", "args": args });
    if name == "puppeteer" {
        config["env"] = json!({});
    }
    Some(config)
}

/// Catalogue entry with the connection string pointed at `project_name`.
#[must_use]
pub fn database_server_config(database: Database, project_name: &str) -> Option<Value> {
    let mut config = server_config(database.server()?)?;
    let connection = database.connection_string(project_name)?;
    if let Some(args) = config.get_mut("args").and_then(Value::as_array_mut)
        && let Some(last) = args.last_mut()
    {
        *last = Value::String(connection);
    }
    Some(config)
}

/// Permission lists for `.claude/settings.json`.
#[must_use]
pub fn default_permissions(framework: Framework) -> (Vec<String>, Vec<String>) {
    let mut allow: Vec<String> = ["Read(**)", "Edit(**)", "Bash(git status)", "Bash(git diff:*)"]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    allow.extend(framework.extra_permissions().iter().map(|s| (*s).to_string()));
    let deny = ["Read(.env)", "Read(.env.*)", "Bash(rm -rf:*)"].iter().map(|s| (*s).to_string()).collect();
    (allow, deny)
}
