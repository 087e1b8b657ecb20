use crate::runtime::Runtime;

/// OS family and CPU architecture, as reported by the host or requested by the user.
///
/// Values are kept verbatim so error messages can name exactly what was seen;
/// normalisation happens during [`super::resolve_target`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform of the running host
    pub fn detect<R: Runtime>(runtime: &R) -> Self {
        Self::new(runtime.host_os(), runtime.host_arch())
    }

    /// Host platform with any user-supplied overrides applied.
    pub fn detect_with_overrides<R: Runtime>(
        runtime: &R,
        os: Option<&str>,
        arch: Option<&str>,
    ) -> Self {
        let os = os.map(str::to_string).unwrap_or_else(|| runtime.host_os());
        let arch = arch
            .map(str::to_string)
            .unwrap_or_else(|| runtime.host_arch());
        Self::new(os, arch)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
