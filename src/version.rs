//! Dependency version checks
//!
//! The AutoML layer relies on features of the deep-learning framework and of
//! the tuner that only exist from a given release on. Running against an older
//! release is allowed but unsupported, so a mismatch is reported as a warning
//! and execution carries on.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::config::VersionConfig;
use crate::error::{AutokitError, Result};

/// Oldest framework release the helpers are tested against
pub const FRAMEWORK_MIN_VERSION: &str = "2.7.0";
/// Oldest tuner release the helpers are tested against
pub const TUNER_MIN_VERSION: &str = "1.1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrePhase {
    Alpha,
    Beta,
    Rc,
}

/// Pre, post and dev segments following the numeric release, e.g. the
/// `rc1.dev0` of `2.7.0rc1.dev0` or the `-1` of `2.7.0-1` (post 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Suffix {
    pub pre: Option<(PrePhase, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
}

impl Suffix {
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// A bare dev release sorts before every pre-release of the same version
    fn pre_key(&self) -> (u8, Option<(PrePhase, u64)>) {
        match (self.pre, self.post, self.dev) {
            (None, None, Some(_)) => (0, None),
            (Some(pre), _, _) => (1, Some(pre)),
            (None, _, _) => (2, None),
        }
    }

    /// Dev releases sort before the release they lead up to
    fn dev_key(&self) -> (bool, u64) {
        match self.dev {
            Some(n) => (false, n),
            None => (true, 0),
        }
    }
}

impl Ord for Suffix {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pre_key()
            .cmp(&other.pre_key())
            .then(self.post.cmp(&other.post))
            .then(self.dev_key().cmp(&other.dev_key()))
    }
}

impl PartialOrd for Suffix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A dotted release version such as `2.7.0`, `2.15.0rc1` or `1.1.0.post2`
///
/// Release segments compare numerically with implicit zero padding, so
/// `2.7 == 2.7.0` and `2.10.0 > 2.9.3`. Local labels (`+cpu`) are ignored.
#[derive(Debug, Clone)]
pub struct Version {
    release: Vec<u64>,
    suffix: Suffix,
    raw: String,
}

impl Version {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        let public = raw.split('+').next().unwrap_or_default();
        let public = public.strip_prefix(&['v', 'V'][..]).unwrap_or(public);

        let release_end = public
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(public.len());
        let (release_str, suffix_str) = public.split_at(release_end);
        let release_str = release_str.trim_end_matches('.');

        if release_str.is_empty() {
            return Err(invalid(raw));
        }

        let release = release_str
            .split('.')
            .map(|seg| seg.parse::<u64>().map_err(|_| invalid(raw)))
            .collect::<Result<Vec<_>>>()?;

        let suffix = parse_suffix(suffix_str).ok_or_else(|| invalid(raw))?;

        Ok(Self {
            release,
            suffix,
            raw: raw.to_string(),
        })
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    pub fn suffix(&self) -> Suffix {
        self.suffix
    }

    pub fn is_prerelease(&self) -> bool {
        self.suffix.is_prerelease()
    }
}

fn invalid(raw: &str) -> AutokitError {
    AutokitError::Validation(format!("Invalid version: '{}'", raw))
}

const SEPARATORS: &[char] = &['.', '-', '_'];

/// Parse `[pre][post][dev]`, each segment optional, e.g. `rc1`, `.post2`,
/// `-3` (implicit post), `.dev0` or `rc1.dev0`
fn parse_suffix(suffix: &str) -> Option<Suffix> {
    let lower = suffix.to_ascii_lowercase();
    let mut rest = lower.as_str();
    let mut out = Suffix::default();

    if let Some((label, number, tail)) = take_segment(rest) {
        if let Some(phase) = pre_phase(label) {
            out.pre = Some((phase, number));
            rest = tail;
        }
    }

    let implicit_post = rest
        .strip_prefix('-')
        .filter(|digits| digits.starts_with(|c: char| c.is_ascii_digit()));
    if let Some(digits) = implicit_post {
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        out.post = Some(digits[..end].parse().ok()?);
        rest = &digits[end..];
    } else if let Some((label, number, tail)) = take_segment(rest) {
        if matches!(label, "post" | "rev" | "r") {
            out.post = Some(number);
            rest = tail;
        }
    }

    if let Some(("dev", number, tail)) = take_segment(rest) {
        out.dev = Some(number);
        rest = tail;
    }

    rest.is_empty().then_some(out)
}

/// Split `[sep]label[[sep]digits]` off the front of `s`.
///
/// A missing number counts as 0.
fn take_segment(s: &str) -> Option<(&str, u64, &str)> {
    let s = s.strip_prefix(SEPARATORS).unwrap_or(s);
    let label_end = s
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    if label_end == 0 {
        return None;
    }
    let (label, tail) = s.split_at(label_end);

    let after_sep = tail.strip_prefix(SEPARATORS).unwrap_or(tail);
    let digits_end = after_sep
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(after_sep.len());
    if digits_end == 0 {
        return Some((label, 0, tail));
    }
    let number = after_sep[..digits_end].parse().ok()?;
    Some((label, number, &after_sep[digits_end..]))
}

fn pre_phase(label: &str) -> Option<PrePhase> {
    match label {
        "a" | "alpha" => Some(PrePhase::Alpha),
        "b" | "beta" => Some(PrePhase::Beta),
        "rc" | "c" | "pre" | "preview" => Some(PrePhase::Rc),
        _ => None,
    }
}

impl FromStr for Version {
    type Err = AutokitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        let segment = |v: &Version, i: usize| v.release.get(i).copied().unwrap_or(0);
        (0..width)
            .map(|i| segment(self, i).cmp(&segment(other, i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            .then(self.suffix.cmp(&other.suffix))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A dependency and the oldest release the helpers support
#[derive(Debug, Clone)]
pub struct DependencyRequirement {
    /// Human readable package name
    pub display_name: String,
    /// Name to pass to the package installer
    pub install_name: String,
    pub minimum: Version,
}

impl DependencyRequirement {
    pub fn new(display_name: &str, install_name: &str, minimum: Version) -> Self {
        Self {
            display_name: display_name.to_string(),
            install_name: install_name.to_string(),
            minimum,
        }
    }

    pub fn framework(config: &VersionConfig) -> Result<Self> {
        Ok(Self::new(
            "Tensorflow",
            "tensorflow",
            Version::parse(&config.framework_min)?,
        ))
    }

    pub fn tuner(config: &VersionConfig) -> Result<Self> {
        Ok(Self::new(
            "Keras Tuner",
            "keras-tuner",
            Version::parse(&config.tuner_min)?,
        ))
    }
}

/// Non-fatal notice that an installed dependency is older than supported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionWarning {
    pub display_name: String,
    pub install_name: String,
    pub minimum: String,
    pub installed: String,
}

impl fmt::Display for VersionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The {name} package version needs to be at least {min} \n\
             for AutoKeras to run. Currently, your {name} version is \n\
             {installed}. Please upgrade with \n\
             `$ pip install --upgrade {pkg}`. \n\
             You can use `pip freeze` to check afterwards that everything is ok.",
            name = self.display_name,
            min = self.minimum,
            installed = self.installed,
            pkg = self.install_name,
        )
    }
}

/// Compare an installed version string against a requirement.
///
/// Emits one `warn!` event and returns the warning when the installed
/// version is older than the minimum or cannot be parsed.
pub fn check_dependency_version(
    requirement: &DependencyRequirement,
    installed: &str,
) -> Option<VersionWarning> {
    let outdated = match Version::parse(installed) {
        Ok(version) => version < requirement.minimum,
        Err(_) => true,
    };
    if !outdated {
        return None;
    }

    let warning = VersionWarning {
        display_name: requirement.display_name.clone(),
        install_name: requirement.install_name.clone(),
        minimum: requirement.minimum.to_string(),
        installed: installed.trim().to_string(),
    };
    warn!(
        package = %requirement.install_name,
        installed = %warning.installed,
        minimum = %warning.minimum,
        "{}",
        warning
    );
    Some(warning)
}

/// Warn when the installed framework is older than 2.7.0
pub fn check_tf_version(installed: &str) -> Option<VersionWarning> {
    let requirement =
        DependencyRequirement::new("Tensorflow", "tensorflow", builtin(FRAMEWORK_MIN_VERSION));
    check_dependency_version(&requirement, installed)
}

/// Warn when the installed tuner is older than 1.1.0
pub fn check_kt_version(installed: &str) -> Option<VersionWarning> {
    let requirement =
        DependencyRequirement::new("Keras Tuner", "keras-tuner", builtin(TUNER_MIN_VERSION));
    check_dependency_version(&requirement, installed)
}

fn builtin(version: &str) -> Version {
    Version {
        release: version.split('.').filter_map(|s| s.parse().ok()).collect(),
        suffix: Suffix::default(),
        raw: version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_numeric_not_lexicographic() {
        assert!(v("2.10.0") > v("2.9.3"));
        assert!(v("2.7.0") > v("2.6.99"));
        assert!(v("10.0") > v("9.9.9"));
    }

    #[test]
    fn test_zero_padding_equality() {
        assert_eq!(v("2.7"), v("2.7.0"));
        assert_eq!(v("2.7.0.0"), v("2.7"));
        assert_eq!(v("v1.1.0"), v("1.1.0"));
        assert_eq!(v("1.1.0+cpu"), v("1.1.0"));
    }

    #[test]
    fn test_suffix_ordering() {
        assert!(v("2.7.0rc1") < v("2.7.0"));
        assert!(v("2.7.0.dev5") < v("2.7.0a1"));
        assert!(v("2.7.0a1") < v("2.7.0b1"));
        assert!(v("2.7.0b2") < v("2.7.0rc0"));
        assert!(v("2.7.0-rc1") < v("2.7.0rc2"));
        assert!(v("2.7.0.post1") > v("2.7.0"));
        assert!(v("2.7.0rc1") > v("2.6.5"));
        assert!(v("2.15.0rc1").is_prerelease());
    }

    #[test]
    fn test_implicit_post_and_dev_segments() {
        assert_eq!(v("2.7.0-1"), v("2.7.0.post1"));
        assert_eq!(v("2.7.0-1").suffix().post, Some(1));
        assert!(v("2.7.0-1") > v("2.7.0"));

        assert!(v("1.1.0.post1.dev0") > v("1.1.0"));
        assert!(v("1.1.0.post1.dev0") < v("1.1.0.post1"));
        assert!(!v("1.1.0.post1").is_prerelease());
        assert!(v("1.1.0.post1.dev0").is_prerelease());

        assert!(v("2.7.0rc1.dev0") < v("2.7.0rc1"));
        assert!(v("2.7.0rc1.dev0") > v("2.7.0rc0"));
        assert!(v("2.7.0rc1.post1") > v("2.7.0rc1"));
        assert!(v("2.7.0rc1.post1") < v("2.7.0"));
        assert!(v("2.8.0-dev") < v("2.8.0a0"));
        assert!(v("2.8.0-dev") > v("2.7.9"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("latest").is_err());
        assert!(Version::parse("2.x.0").is_err());
        assert!(Version::parse("2.7.0banana").is_err());
        assert!(Version::parse("2.7.0-").is_err());
        assert!(Version::parse("2.7.0rc1.dev0.post1").is_err());
        assert!("2.7.0".parse::<Version>().is_ok());
    }

    #[test]
    fn test_tf_version_below_minimum_warns() {
        let warning = check_tf_version("2.6.0").expect("should warn");
        assert_eq!(warning.installed, "2.6.0");
        assert_eq!(warning.minimum, "2.7.0");
        let msg = warning.to_string();
        assert!(msg.contains("at least 2.7.0"));
        assert!(msg.contains("2.6.0"));
        assert!(msg.contains("pip install --upgrade tensorflow"));
    }

    #[test]
    fn test_tf_version_at_or_above_minimum_is_silent() {
        assert!(check_tf_version("2.7.0").is_none());
        assert!(check_tf_version("2.7").is_none());
        assert!(check_tf_version("2.15.1").is_none());
        assert!(check_tf_version("2.7.0-1").is_none());
        assert!(check_tf_version("2.7.0.post1.dev0").is_none());
        assert!(check_tf_version("2.8.0rc1.dev0").is_none());
        assert!(check_tf_version("2.7.0rc1").is_some());
        assert!(check_tf_version("2.7.0rc1.dev0").is_some());
        assert!(check_kt_version("1.1.0.post1.dev0").is_none());
    }

    #[test]
    fn test_kt_version() {
        let warning = check_kt_version("1.0.4").expect("should warn");
        assert!(warning.to_string().contains("pip install --upgrade keras-tuner"));
        assert!(warning.to_string().contains("Keras Tuner"));
        assert!(check_kt_version("1.1.0").is_none());
        assert!(check_kt_version("1.4.6").is_none());
    }

    #[test]
    fn test_unparseable_installed_version_warns() {
        let warning = check_kt_version("unknown").expect("should warn");
        assert_eq!(warning.installed, "unknown");
    }

    #[test]
    fn test_requirements_from_config() {
        let config = VersionConfig {
            framework_min: "2.12".to_string(),
            tuner_min: "1.3.5".to_string(),
        };
        let framework = DependencyRequirement::framework(&config).unwrap();
        assert!(check_dependency_version(&framework, "2.11.0").is_some());
        assert!(check_dependency_version(&framework, "2.12.0").is_none());

        let tuner = DependencyRequirement::tuner(&config).unwrap();
        assert!(check_dependency_version(&tuner, "1.3.4").is_some());

        let bad = VersionConfig {
            framework_min: "two".to_string(),
            ..VersionConfig::default()
        };
        assert!(DependencyRequirement::framework(&bad).is_err());
    }
}
