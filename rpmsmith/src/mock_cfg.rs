//! Mock chroot configuration template.

use crate::dnfconfig::RepoParams;
use crate::error::ConfigError;
use crate::template::Template;
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholders the template may use.
pub const MOCK_CFG_KEYS: &[&str] = &["root", "arch", "repos", "includes"];

/// Placeholders the template must use.
pub const MOCK_CFG_REQUIRED: &[&str] = &["arch", "repos"];

/// Name of the rendered file inside `mock-cfg/`.
pub const MOCK_CFG_FILE: &str = "mock.cfg";

const BUILTIN_TEMPLATE: &str = r#"config_opts['root'] = '{root}'
config_opts['target_arch'] = '{arch}'
config_opts['legal_host_arches'] = ('{arch}',)
config_opts['chroot_setup_cmd'] = 'install @buildsys-build'
config_opts['package_manager'] = 'dnf'
config_opts['releasever'] = '9'

config_opts['dnf.conf'] = """
[main]
keepcache=1
debuglevel=2
reposdir=/dev/null
logfile=/var/log/yum.log
retries=20
obsoletes=1
gpgcheck=0
assumeyes=1
syslog_ident=mock
syslog_device=
install_weak_deps=0
metadata_expire=0
best=1
module_platform_id=platform:el9

{repos}
"""
{includes}
"#;

/// A parsed, validated mock config template.
#[derive(Debug, Clone)]
pub struct MockCfgTemplate {
    template: Template,
}

impl MockCfgTemplate {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let template = Template::parse_with_keys(source, MOCK_CFG_KEYS)
            .and_then(|t| t.require(MOCK_CFG_REQUIRED).map(|()| t))
            .map_err(|err| ConfigError::template("mock config template", err))?;
        Ok(Self { template })
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(BUILTIN_TEMPLATE)
    }

    /// Load from `path`, or fall back to the built-in template.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Self::builtin();
        };
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|err| err.at(path))
    }

    pub fn render(
        &self,
        root: &str,
        arch: &str,
        repos: &[RepoParams],
        includes: &[PathBuf],
    ) -> Result<String, ConfigError> {
        let repos = repos.iter().map(render_repo).collect::<Vec<_>>().join("\n");
        let includes = includes
            .iter()
            .map(|path| format!("include('{}')\n", path.display()))
            .collect::<String>();
        self.template
            .render(&[
                ("root", root),
                ("arch", arch),
                ("repos", repos.as_str()),
                ("includes", includes.as_str()),
            ])
            .map_err(|err| ConfigError::template("mock config template", err))
    }
}

/// One repo as a dnf.conf section.
pub fn render_repo(repo: &RepoParams) -> String {
    let mut out = format!(
        "[{name}]\nname={name}\nbaseurl={}\nenabled={}\npriority={}\ngpgcheck={}\n",
        repo.base_url,
        u8::from(repo.enabled),
        repo.priority,
        u8::from(repo.gpgcheck),
        name = repo.name,
    );
    if let Some(key) = &repo.gpgkey {
        out.push_str(&format!("gpgkey={key}\n"));
    }
    if let Some(exclude) = &repo.exclude {
        out.push_str(&format!("excludepkgs={exclude}\n"));
    }
    out
}
