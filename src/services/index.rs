//! Lookup tables over candidate service nodes

use std::collections::{BTreeMap, BTreeSet};

use crate::constants::services::MIN_SERVICE_NAME_LEN;
use crate::types::{
    Category, ComposeService, Endpoint, ProjectId, ProjectResult, ProjectType,
    normalize_service_name,
};

/// Signature ids that mark container or orchestration descriptors
const DESCRIPTOR_SIGNATURES: &[&str] = &["docker", "docker-compose", "kubernetes"];

/// True when a project can be a node of the service graph
///
/// Services by type, web or API frameworks that declare endpoints, message
/// broker clients, projects with container descriptors and non-frontend
/// projects showing architecture indicators (discovery, gateway, health
/// endpoints, circuit breakers) qualify.
pub fn is_candidate(project: &ProjectResult) -> bool {
    if project.is_failed() {
        return false;
    }
    if project.project_type == ProjectType::Service {
        return true;
    }
    let web = project
        .matches
        .iter()
        .any(|m| matches!(m.category, Category::Web | Category::Api));
    if web && !project.facts.endpoints.is_empty() {
        return true;
    }
    if project.has_category(Category::Microservice) && project.project_type != ProjectType::Frontend {
        return true;
    }
    project.has_category(Category::Messaging)
        || project
            .matches
            .iter()
            .any(|m| DESCRIPTOR_SIGNATURES.contains(&m.signature_id.as_str()))
}

/// A compose service together with the project that declares it
#[derive(Debug, Clone)]
pub struct DeclaredService<'a> {
    pub owner: ProjectId,
    /// Directory of the compose file, relative to the scan root
    pub base: String,
    pub service: &'a ComposeService,
}

/// Name, port, path and endpoint lookups over the candidate projects
pub struct ServiceIndex<'a> {
    candidates: Vec<&'a ProjectResult>,
    by_name: BTreeMap<String, BTreeSet<ProjectId>>,
    by_path: BTreeMap<String, ProjectId>,
    by_port: BTreeMap<u16, BTreeSet<ProjectId>>,
    names: BTreeMap<ProjectId, BTreeSet<String>>,
    compose: Vec<DeclaredService<'a>>,
}

impl<'a> ServiceIndex<'a> {
    pub fn build(projects: &'a [ProjectResult]) -> Self {
        let candidates: Vec<&ProjectResult> = projects.iter().filter(|p| is_candidate(p)).collect();

        let mut index = Self {
            candidates,
            by_name: BTreeMap::new(),
            by_path: BTreeMap::new(),
            by_port: BTreeMap::new(),
            names: BTreeMap::new(),
            compose: Vec::new(),
        };

        for project in index.candidates.clone() {
            index.by_path.insert(project.root.relative_path.clone(), project.id);
            index.add_name(project.id, &project.name);
            if let Some(declared) = &project.facts.declared_name {
                index.add_name(project.id, declared);
                // Scoped package names: "@acme/orders" also answers to "orders"
                if let Some((_, last)) = declared.rsplit_once('/') {
                    index.add_name(project.id, last);
                }
            }
            for port in &project.facts.exposed_ports {
                index.by_port.entry(*port).or_default().insert(project.id);
            }
        }

        // Compose files anywhere in the tree name the projects they build
        for project in projects {
            for service in &project.facts.compose_services {
                index.compose.push(DeclaredService {
                    owner: project.id,
                    base: join_relative(&project.root.relative_path, parent_dir(&service.file)),
                    service,
                });
            }
        }
        let built: Vec<(ProjectId, String)> = index
            .compose
            .iter()
            .filter_map(|declared| {
                let context = declared.service.build.as_deref()?;
                let target = index.by_path.get(&join_relative(&declared.base, context))?;
                Some((*target, declared.service.name.clone()))
            })
            .collect();
        for (id, name) in built {
            index.add_name(id, &name);
        }

        index
    }

    fn add_name(&mut self, id: ProjectId, name: &str) {
        let normalized = normalize_service_name(name);
        if normalized.is_empty() {
            return;
        }
        self.by_name.entry(normalized.clone()).or_default().insert(id);
        self.names.entry(id).or_default().insert(normalized);
    }

    pub fn candidates(&self) -> &[&'a ProjectResult] {
        &self.candidates
    }

    pub fn node_ids(&self) -> BTreeSet<ProjectId> {
        self.candidates.iter().map(|p| p.id).collect()
    }

    /// Normalized names a candidate answers to
    pub fn names_of(&self, id: ProjectId) -> impl Iterator<Item = &str> {
        self.names
            .get(&id)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    /// The single candidate other than `exclude` known by `name`
    ///
    /// Ambiguous names resolve to nothing.
    pub fn resolve_name(&self, name: &str, exclude: ProjectId) -> Option<ProjectId> {
        self.lookup(name, Some(exclude))
    }

    fn lookup(&self, name: &str, exclude: Option<ProjectId>) -> Option<ProjectId> {
        let ids = self.by_name.get(&normalize_service_name(name))?;
        single(ids.iter().copied().filter(|id| Some(*id) != exclude))
    }

    /// Like [`resolve_name`](Self::resolve_name), but only for names long enough
    /// to be meaningful inside free text
    pub fn resolve_token(&self, token: &str, exclude: ProjectId) -> Option<ProjectId> {
        if normalize_service_name(token).len() < MIN_SERVICE_NAME_LEN {
            return None;
        }
        self.resolve_name(token, exclude)
    }

    /// The single candidate other than `exclude` exposing `port`
    pub fn resolve_port(&self, port: u16, exclude: ProjectId) -> Option<ProjectId> {
        let ids = self.by_port.get(&port)?;
        single(ids.iter().copied().filter(|id| *id != exclude))
    }

    /// The single candidate other than `exclude` declaring a specific endpoint
    /// that prefixes `path`
    pub fn resolve_endpoint(&self, path: &str, exclude: ProjectId) -> Option<(ProjectId, &'a Endpoint)> {
        let mut found: Option<(ProjectId, &'a Endpoint)> = None;
        for project in self.candidates.iter().filter(|p| p.id != exclude) {
            let hit = project
                .facts
                .endpoints
                .iter()
                .filter(|e| !e.kind.is_generic())
                .find(|e| endpoint_prefix(&e.path).is_some_and(|prefix| path_has_prefix(path, &prefix)));
            if let Some(endpoint) = hit {
                match found {
                    Some((other, _)) if other != project.id => return None,
                    _ => found = Some((project.id, endpoint)),
                }
            }
        }
        found
    }

    /// Compose services of every project, with the directory they were declared in
    pub fn compose_services(&self) -> &[DeclaredService<'a>] {
        &self.compose
    }

    /// Candidate a compose service stands for: its build context, else its name,
    /// else the base name of its image
    pub fn resolve_compose(&self, declared: &DeclaredService<'_>) -> Option<ProjectId> {
        let service = declared.service;
        if let Some(context) = service.build.as_deref()
            && let Some(id) = self.by_path.get(&join_relative(&declared.base, context))
        {
            return Some(*id);
        }
        self.lookup(&service.name, None).or_else(|| {
            let image = image_base_name(service.image.as_deref()?);
            if normalize_service_name(image).len() < MIN_SERVICE_NAME_LEN {
                return None;
            }
            self.lookup(image, None)
        })
    }
}

fn single(mut ids: impl Iterator<Item = ProjectId>) -> Option<ProjectId> {
    let first = ids.next()?;
    ids.next().is_none().then_some(first)
}

/// `registry/acme/orders:1.2` → `orders`
pub fn image_base_name(image: &str) -> &str {
    let without_tag = image.rsplit('/').next().unwrap_or(image);
    without_tag.split([':', '@']).next().unwrap_or(without_tag)
}

/// Static part of an endpoint path, up to the first parameter segment
///
/// `None` when nothing specific remains (`/`, `/{id}`).
pub fn endpoint_prefix(path: &str) -> Option<String> {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .take_while(|s| !is_parameter(s))
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/").to_ascii_lowercase()))
}

fn is_parameter(segment: &str) -> bool {
    segment.starts_with(':')
        || segment.starts_with('<')
        || segment.starts_with('{')
        || segment.starts_with('(')
        || segment.contains('*')
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let path = path.to_ascii_lowercase();
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}

fn parent_dir(relative_file: &str) -> &str {
    relative_file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Lexically join `/`-separated relative paths, resolving `.` and `..`
///
/// Paths escaping the base stop at the scan root.
pub fn join_relative(base: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}
