// src/recipe/config.rs

//! BuildConfiguration: the immutable record every phase receives

use crate::error::{Error, Result};
use crate::hash::Checksum;
use crate::recipe::format::{PACKAGE_NAME, RecipeFile, SecuritySection};
use crate::recipe::options::{DependencyOptions, EffectiveOptions, propagate_dependency_options};
use crate::settings::{OsFamily, Settings};
use crate::version::PythonVersion;
use tracing::warn;

/// Upstream download location; `{release}` is the numeric `X.Y.Z` and
/// `{version}` the full version string
const UPSTREAM_URL: &str = "https://www.python.org/ftp/python/{release}/Python-{version}.tar.xz";

/// Where and how to fetch the source archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub url: String,
    pub checksum: Option<Checksum>,
}

impl SourceSpec {
    /// Archive filename taken from the URL
    pub fn archive_filename(&self) -> String {
        self.url
            .split('/')
            .next_back()
            .filter(|name| !name.is_empty())
            .unwrap_or("source.tar.xz")
            .to_string()
    }
}

/// Names of the external security tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityTools {
    pub sbom_tool: String,
    pub scanner: String,
}

impl From<&SecuritySection> for SecurityTools {
    fn from(section: &SecuritySection) -> Self {
        Self {
            sbom_tool: section.sbom_tool.clone(),
            scanner: section.scanner.clone(),
        }
    }
}

/// Settings plus resolved options for one invocation
///
/// Created once at invocation start and passed by reference into every
/// phase; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    pub name: String,
    pub version: PythonVersion,
    pub settings: Settings,
    pub options: EffectiveOptions,
    pub dependencies: DependencyOptions,
    pub source: SourceSpec,
    pub security: SecurityTools,
}

impl BuildConfiguration {
    /// Build the configuration from a recipe file over the given base settings
    ///
    /// `settings` normally comes from [`Settings::detect_host`]; entries in
    /// the file's `[settings]` table are applied on top.
    pub fn from_recipe(recipe: &RecipeFile, mut settings: Settings) -> Result<Self> {
        for (key, value) in &recipe.settings {
            settings.set(key, value)?;
        }
        settings.validate()?;

        let version = PythonVersion::parse(&recipe.package.version)?;
        let options = EffectiveOptions::resolve(&recipe.options, &settings)?;
        let dependencies = propagate_dependency_options(&settings, &options);

        let url = match &recipe.source.url {
            Some(url) => url.replace("%(version)s", &version.to_string()),
            None => upstream_url(&version),
        };
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(Error::ConfigurationError(format!(
                "Source URL must be http(s): {}",
                url
            )));
        }

        let checksum = match &recipe.source.checksum {
            Some(c) => Some(c.parse::<Checksum>().map_err(|e| {
                Error::ConfigurationError(format!("Invalid source checksum: {}", e))
            })?),
            None => {
                warn!(
                    "No checksum pinned for Python-{}; the source archive will not be verified",
                    version
                );
                None
            }
        };

        Ok(Self {
            name: PACKAGE_NAME.to_string(),
            version,
            settings,
            options,
            dependencies,
            source: SourceSpec { url, checksum },
            security: SecurityTools::from(&recipe.security),
        })
    }

    pub fn family(&self) -> OsFamily {
        self.settings.os.family()
    }

    /// Interpreter executable name by OS convention
    pub fn interpreter_name(&self) -> &'static str {
        match self.family() {
            OsFamily::Windows => "python.exe",
            OsFamily::UnixLike | OsFamily::MacOS => "python",
        }
    }

    /// `python<X.Y>`, the standard-library directory name under `lib/`
    pub fn stdlib_dirname(&self) -> String {
        format!("python{}", self.version.short())
    }
}

/// Deterministic upstream archive URL for a version
pub fn upstream_url(version: &PythonVersion) -> String {
    UPSTREAM_URL
        .replace("{release}", &version.release())
        .replace("{version}", &version.to_string())
}
