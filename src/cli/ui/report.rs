//! Console and JSON renderings of an analysis result

use std::fmt::Write;

use console::style;

use crate::cli::progress::format_duration;
use crate::types::{AnalysisResult, ProjectId, ProjectResult, Result, ScanError};

/// Matches listed per project in the text report
const MATCHES_SHOWN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ScanError::Config(format!(
                "Invalid format '{}'. Valid values: text, json",
                s
            ))),
        }
    }
}

pub fn render_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Human summary: projects with their top matches, the service graph, warnings
pub fn render_text(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let summary = &result.summary;
    let duration = (result.finished_at - result.started_at)
        .num_milliseconds()
        .max(0) as u64;

    let _ = writeln!(
        out,
        "{} {}",
        style("Scan of").bold(),
        style(result.scan_root.display()).bold().underlined()
    );
    if result.is_cancelled() {
        let _ = writeln!(out, "{}", style("Run cancelled; results are incomplete").yellow());
    }
    let _ = writeln!(
        out,
        "Projects: {} ({} failed)  Files: {}  Lines: {}  Duration: {}",
        summary.total_projects,
        summary.failed_projects,
        summary.total_files,
        summary.total_lines,
        format_duration(duration)
    );

    if !summary.languages.is_empty() {
        let languages: Vec<_> = summary
            .languages
            .iter()
            .map(|(lang, n)| format!("{} {}", lang, n))
            .collect();
        let _ = writeln!(out, "Languages: {}", languages.join(", "));
    }

    let _ = writeln!(out, "\n{}", style("Projects").bold());
    let _ = writeln!(out, "{}", "─".repeat(40));
    let width = result
        .projects
        .iter()
        .map(|p| display_path(p).len())
        .max()
        .unwrap_or(0);
    for project in &result.projects {
        let _ = writeln!(out, "  {}", project_line(project, width));
    }

    if !result.service_nodes.is_empty() {
        let _ = writeln!(
            out,
            "\n{} ({} nodes, {} edges)",
            style("Services").bold(),
            result.service_nodes.len(),
            result.edges.len()
        );
        let _ = writeln!(out, "{}", "─".repeat(40));
        let name = |id: ProjectId| {
            result
                .project(id)
                .map(display_path)
                .unwrap_or_else(|| id.to_string())
        };
        for id in &result.service_nodes {
            let communication = result
                .project(*id)
                .and_then(|p| p.facts.primary_communication())
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  {}  {}", name(*id), style(communication).dim());
        }
        for edge in &result.edges {
            let evidence: Vec<_> = edge.evidence.iter().map(|e| e.detail.as_str()).collect();
            let protocols: Vec<_> = edge.protocols().iter().map(|p| p.to_string()).collect();
            let kind = if protocols.is_empty() {
                edge.kind.to_string()
            } else {
                format!("{} ({})", edge.kind, protocols.join("/"))
            };
            let _ = writeln!(
                out,
                "  {} → {}  {}  {}",
                name(edge.source),
                name(edge.target),
                style(kind).cyan(),
                style(evidence.join(", ")).dim()
            );
        }
        let _ = writeln!(
            out,
            "  {}",
            style("Inferred heuristically from names, ports, topics and URLs").dim()
        );
    }

    let warnings: Vec<_> = result.all_warnings().collect();
    if !warnings.is_empty() {
        let _ = writeln!(out, "\n{} ({})", style("Warnings").bold(), warnings.len());
        let _ = writeln!(out, "{}", "─".repeat(40));
        for issue in warnings {
            let _ = writeln!(out, "  {} {}", style("⚠").yellow(), issue);
        }
    }
    out
}

fn display_path(project: &ProjectResult) -> String {
    if project.root.relative_path.is_empty() {
        ".".to_string()
    } else {
        project.root.relative_path.clone()
    }
}

fn project_line(project: &ProjectResult, width: usize) -> String {
    let path = format!("{:width$}", display_path(project), width = width);
    if let Some(error) = &project.error {
        return format!("{}  {}", path, style(format!("failed: {}", error.kind)).red());
    }

    let matches: Vec<_> = project
        .matches
        .iter()
        .take(MATCHES_SHOWN)
        .map(|m| format!("{} ({:.2})", m.name, m.confidence))
        .collect();
    format!(
        "{}  {:<10} {:<8}  {}",
        path,
        project.primary_language.as_str(),
        project.project_type.to_string(),
        matches.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{RunParts, aggregate};
    use crate::types::{
        Category, CommunicationStyle, EdgeEvidence, EdgeKind, ErrorKind, EvidenceSource,
        FrameworkMatch, Language, ProjectRoot, ProjectType, ScanIssue, ServiceEdge,
    };
    use std::path::PathBuf;

    fn sample() -> AnalysisResult {
        let root = ProjectRoot {
            id: ProjectId::new(0),
            path: PathBuf::from("/scan/api"),
            relative_path: "api".to_string(),
            markers: vec!["requirements.txt".to_string()],
            depth: 1,
        };
        let mut api = ProjectResult::failed(root, ScanIssue::new(ErrorKind::Io, "x"));
        api.error = None;
        api.primary_language = Language::Python;
        api.project_type = ProjectType::Service;
        api.matches.push(FrameworkMatch {
            signature_id: "flask".to_string(),
            name: "Flask".to_string(),
            category: Category::Web,
            language: Some(Language::Python),
            confidence: 0.82,
            evidence: vec!["app.py".to_string()],
        });

        aggregate(RunParts {
            scan_root: PathBuf::from("/scan"),
            projects: vec![api],
            errors: vec![ScanIssue::at(ErrorKind::DirectoryUnreadable, "/scan/locked", "denied")],
            ..Default::default()
        })
    }

    #[test]
    fn test_text_report_lists_projects_and_warnings() {
        let text = render_text(&sample());
        assert!(text.contains("api"));
        assert!(text.contains("Flask (0.82)"));
        assert!(text.contains("python"));
        assert!(text.contains("DIRECTORY_UNREADABLE"));
        assert!(!text.contains("Services"));
    }

    #[test]
    fn test_services_section_shows_protocols() {
        let mut result = sample();
        let caller = ProjectId::new(1);
        let mut web = result.projects[0].clone();
        web.id = caller;
        web.root.id = caller;
        web.root.relative_path = "web".to_string();
        web.facts.record_style(CommunicationStyle::Grpc);
        result.projects.push(web);
        result.service_nodes = [ProjectId::new(0), caller].into_iter().collect();
        result.edges.push(ServiceEdge {
            source: caller,
            target: ProjectId::new(0),
            kind: EdgeKind::RestCall,
            evidence: [EdgeEvidence::new(EvidenceSource::UrlHost, "grpc://api:50051")
                .with_protocol(CommunicationStyle::Grpc)]
            .into_iter()
            .collect(),
        });

        let text = render_text(&result);
        assert!(text.contains("Services (2 nodes, 1 edges)"));
        assert!(text.contains("rest-call (gRPC)"));
        assert!(text.contains("grpc://api:50051"));
        assert!(text.contains("  web  gRPC"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let result = sample();
        let json = render_json(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, result.run_id);
        assert_eq!(parsed.projects[0].matches[0].signature_id, "flask");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
