//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Tree walker constants
pub mod walk {
    /// Default maximum depth below the scan root (root = 0)
    pub const DEFAULT_MAX_DEPTH: usize = 3;

    /// Upper bound accepted by config validation
    pub const MAX_DEPTH_LIMIT: usize = 64;

    /// Bounded queue between walker and scheduler
    pub const DISCOVERY_QUEUE_BOUND: usize = 64;

    /// Files whose presence turns a directory into a project root
    pub const MARKER_FILES: &[&str] = &[
        "package.json",
        "requirements.txt",
        "setup.py",
        "setup.cfg",
        "pyproject.toml",
        "Pipfile",
        "Cargo.toml",
        "go.mod",
        "pom.xml",
        "build.gradle",
        "build.gradle.kts",
        "Gemfile",
        "composer.json",
        "Package.swift",
        "pubspec.yaml",
        "mix.exs",
        "build.sbt",
        "CMakeLists.txt",
        "Dockerfile",
        "docker-compose.yml",
        "docker-compose.yaml",
        "compose.yaml",
        "deno.json",
    ];

    /// Container descriptors among the markers
    ///
    /// A directory marked only by these is a project root when no enclosing
    /// project was found; below one it stays part of that project.
    pub const DESCRIPTOR_MARKERS: &[&str] = &[
        "Dockerfile",
        "docker-compose.yml",
        "docker-compose.yaml",
        "compose.yaml",
    ];

    /// Marker globs for manifests with project-specific names
    pub const MARKER_GLOBS: &[&str] = &["*.csproj", "*.sln", "*.fsproj"];

    /// Default ignore patterns (glob semantics against name or relative path)
    pub const DEFAULT_IGNORE: &[&str] = &[
        ".git",
        ".svn",
        ".hg",
        ".idea",
        ".vscode",
        "__pycache__",
        "node_modules",
        "bower_components",
        "venv",
        ".venv",
        "virtualenv",
        ".tox",
        ".mypy_cache",
        ".pytest_cache",
        "dist",
        "build",
        "target",
        "out",
        "vendor",
        "*.egg-info",
        ".cache",
        ".gradle",
        ".next",
        ".nuxt",
    ];
}

/// Classification constants
pub mod classify {
    /// Default number of bytes read per candidate file
    pub const DEFAULT_CONTENT_READ_LIMIT: usize = 64 * 1024;

    /// Maximum files listed for one project
    pub const DEFAULT_MAX_FILES_PER_PROJECT: usize = 5_000;

    /// Candidate files inspected per content rule
    pub const MAX_CANDIDATES_PER_RULE: usize = 200;

    /// Bytes sniffed for NUL to detect binary files
    pub const BINARY_SNIFF_BYTES: usize = 512;

    /// Default per-project time budget (seconds, 0 disables)
    pub const DEFAULT_PROJECT_TIMEOUT_SECS: u64 = 60;

    /// Evidence paths kept per match
    pub const MAX_EVIDENCE_PER_MATCH: usize = 10;

    /// Extensions never read for content
    pub const BINARY_EXTENSIONS: &[&str] = &[
        "png", "jpg", "jpeg", "gif", "bmp", "ico", "svg", "webp", "woff", "woff2", "ttf", "eot",
        "mp3", "mp4", "mov", "avi", "wmv", "pdf", "zip", "tar", "gz", "bz2", "xz", "rar", "7z",
        "exe", "dll", "so", "dylib", "class", "jar", "war", "pyc", "pyo", "o", "a", "wasm",
    ];
}

/// Microservice detection constants
pub mod services {
    /// Shortest service name used for token matching (avoids matching "api", "db")
    pub const MIN_SERVICE_NAME_LEN: usize = 4;

    /// URL fragments that identify external resources rather than services
    pub const EXTERNAL_URL_MARKERS: &[&str] = &[
        "googleapis.com",
        "amazonaws.com",
        "github.com",
        "gitlab.com",
        "cdn",
        "fonts.",
        "maps.",
        "static.",
        "assets.",
        "images.",
        "img.",
        "jquery",
        "bootstrap",
        "fontawesome",
        "polyfill",
        "gtag",
        "schemas.",
        "w3.org",
        "example.com",
    ];

    /// Suffixes of static resources
    pub const STATIC_SUFFIXES: &[&str] = &[
        ".png", ".jpg", ".gif", ".css", ".js", ".ico", ".svg", ".woff", ".html",
    ];

    /// URL fragments that suggest an internal service call
    pub const SERVICE_URL_MARKERS: &[&str] = &[
        "api",
        "service",
        "srv",
        "gateway",
        "localhost",
        "127.0.0.1",
        "internal",
        "endpoint",
        "/v1/",
        "/v2/",
        "/v3/",
        "/rest/",
        "/graphql",
        "grpc://",
    ];
}

/// Worker pool constants
pub mod workers {
    /// Fallback when hardware parallelism is unknown
    pub const FALLBACK_WORKERS: usize = 4;

    /// Upper bound accepted by config validation
    pub const MAX_WORKERS: usize = 256;
}
