//! Catalog forest construction for the admin screens.
//!
//! The API ships two mutually exclusive catalog shapes: a flat service list
//! with parent-category pointers (`GET /home`) and categories carrying their
//! own nested service trees (`GET /admin/services`). Both collapse into one
//! presentation-ready [`Catalog`]; the shape is detected from the input
//! rather than branched on by callers.

use ahash::AHashMap;
use serde::Serialize;

use crate::domain::errors::PortalError;
use crate::domain::models::{Category, EntityRef, Service};

/// Hard bound on service nesting. Tree input deserialized from JSON cannot be
/// cyclic, so this doubles as the recursion guard for hostile or corrupt
/// payloads.
pub const MAX_SERVICE_DEPTH: usize = 32;

/// One service row with its depth annotation and resolved children.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub depth: usize,
    pub children: Vec<ServiceNode>,
}

impl ServiceNode {
    fn build(service: Service, depth: usize) -> Result<Self, PortalError> {
        if depth >= MAX_SERVICE_DEPTH {
            return Err(PortalError::data_integrity(format!(
                "service {} nests deeper than {} levels",
                service.id, MAX_SERVICE_DEPTH
            )));
        }

        let Service {
            id,
            name,
            description,
            icon,
            services,
            ..
        } = service;

        let children = services
            .into_iter()
            .map(|child| Self::build(child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            name,
            description,
            icon,
            depth,
            children,
        })
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::service(self.id)
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(ServiceNode::count).sum::<usize>()
    }
}

/// A category together with the bucket of services routed to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub services: Vec<ServiceNode>,
}

impl CategoryGroup {
    /// Splits a wire category into an empty group and its embedded tree.
    fn open(category: Category) -> (Self, Vec<Service>) {
        let Category {
            id,
            name,
            description,
            icon,
            services,
        } = category;

        (
            Self {
                id,
                name,
                description,
                icon,
                services: Vec::new(),
            },
            services,
        )
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef::category(self.id)
    }
}

/// The rooted forest rendered by the admin screens.
///
/// Every input category appears exactly once in `categories`, in input order;
/// every input service appears exactly once, either under its resolved
/// category or in `uncategorized`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub categories: Vec<CategoryGroup>,
    pub uncategorized: Vec<ServiceNode>,
}

impl Catalog {
    /// Total number of service nodes across all buckets, nested included.
    pub fn service_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|group| group.services.iter())
            .chain(self.uncategorized.iter())
            .map(ServiceNode::count)
            .sum()
    }
}

/// Organizes the two wire shapes into a [`Catalog`].
///
/// A non-empty flat `services` argument selects parent-pointer bucketing;
/// otherwise the categories' embedded trees are passed through with depth
/// annotations attached. Services whose parent does not resolve land in the
/// uncategorized bucket, never dropped and never duplicated.
pub fn organize(categories: Vec<Category>, services: Vec<Service>) -> Result<Catalog, PortalError> {
    if services.is_empty() {
        organize_nested(categories)
    } else {
        organize_flat(categories, services)
    }
}

fn organize_flat(categories: Vec<Category>, services: Vec<Service>) -> Result<Catalog, PortalError> {
    let mut groups: Vec<CategoryGroup> = Vec::with_capacity(categories.len());
    let mut slots: AHashMap<i64, usize> = AHashMap::with_capacity(categories.len());

    for category in categories {
        let (group, _) = CategoryGroup::open(category);
        // first occurrence wins the lookup; a duplicate id still renders
        slots.entry(group.id).or_insert(groups.len());
        groups.push(group);
    }

    let mut uncategorized = Vec::new();
    for service in services {
        let parent = service.parent_category_id;
        let node = ServiceNode::build(service, 0)?;
        match parent.and_then(|id| slots.get(&id)) {
            Some(&slot) => groups[slot].services.push(node),
            None => uncategorized.push(node),
        }
    }

    Ok(Catalog {
        categories: groups,
        uncategorized,
    })
}

fn organize_nested(categories: Vec<Category>) -> Result<Catalog, PortalError> {
    let mut groups = Vec::with_capacity(categories.len());

    for category in categories {
        let (mut group, tree) = CategoryGroup::open(category);
        group.services = tree
            .into_iter()
            .map(|service| ServiceNode::build(service, 0))
            .collect::<Result<Vec<_>, _>>()?;
        groups.push(group);
    }

    Ok(Catalog {
        categories: groups,
        uncategorized: Vec::new(),
    })
}

/// Per-node expanded/collapsed flags for the tree UI.
///
/// Collapsing a parent leaves descendants' recorded state untouched, so
/// re-expanding restores their prior configuration.
#[derive(Debug, Default)]
pub struct ExpansionState {
    open: AHashMap<EntityRef, bool>,
}

impl ExpansionState {
    /// Flips one node; a node never toggled before starts from implicit
    /// `false`, so the first toggle expands. Returns the new flag.
    pub fn toggle(&mut self, node: EntityRef) -> bool {
        let flag = self.open.entry(node).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn is_expanded(&self, node: EntityRef) -> bool {
        self.open.get(&node).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.into(),
            description: None,
            icon: None,
            services: Vec::new(),
        }
    }

    fn service(id: i64, name: &str, parent: Option<i64>) -> Service {
        Service {
            id,
            name: name.into(),
            description: String::new(),
            icon: None,
            parent_category_id: parent,
            services: Vec::new(),
        }
    }

    fn nested(id: i64, name: &str, children: Vec<Service>) -> Service {
        Service {
            services: children,
            ..service(id, name, None)
        }
    }

    #[test]
    fn flat_services_bucket_under_resolved_categories() {
        let categories = vec![category(1, "A")];
        let services = vec![service(10, "X", Some(1)), service(11, "Y", Some(9))];

        let catalog = organize(categories, services).unwrap();

        assert_eq!(catalog.categories.len(), 1);
        assert_eq!(catalog.categories[0].id, 1);
        assert_eq!(catalog.categories[0].services.len(), 1);
        assert_eq!(catalog.categories[0].services[0].name, "X");
        assert_eq!(catalog.uncategorized.len(), 1);
        assert_eq!(catalog.uncategorized[0].name, "Y");
    }

    #[test]
    fn every_service_lands_in_exactly_one_bucket() {
        let categories = vec![category(1, "A"), category(2, "B")];
        let services = vec![
            service(10, "a1", Some(1)),
            service(11, "b1", Some(2)),
            service(12, "a2", Some(1)),
            service(13, "nowhere", None),
        ];

        let catalog = organize(categories, services).unwrap();

        assert_eq!(catalog.service_count(), 4);
        // relative input order survives within a shared bucket
        let names: Vec<_> = catalog.categories[0]
            .services
            .iter()
            .map(|node| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["a1", "a2"]);
    }

    #[test]
    fn empty_category_list_routes_everything_uncategorized() {
        let services = vec![service(10, "X", Some(1)), service(11, "Y", None)];
        let catalog = organize(Vec::new(), services).unwrap();

        assert!(catalog.categories.is_empty());
        assert_eq!(catalog.uncategorized.len(), 2);
        assert_eq!(catalog.uncategorized[0].name, "X");
    }

    #[test]
    fn empty_service_list_keeps_every_category_with_empty_bucket() {
        let categories = vec![category(2, "B"), category(1, "A")];
        let catalog = organize(categories, Vec::new()).unwrap();

        let ids: Vec<_> = catalog.categories.iter().map(|group| group.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(catalog.categories.iter().all(|group| group.services.is_empty()));
        assert!(catalog.uncategorized.is_empty());
    }

    #[test]
    fn duplicate_category_ids_render_twice_but_bucket_to_first() {
        let categories = vec![category(1, "first"), category(1, "second")];
        let services = vec![service(10, "X", Some(1))];

        let catalog = organize(categories, services).unwrap();

        assert_eq!(catalog.categories.len(), 2);
        assert_eq!(catalog.categories[0].services.len(), 1);
        assert!(catalog.categories[1].services.is_empty());
    }

    #[test]
    fn nested_input_passes_through_with_depth_annotations() {
        let tree = nested(10, "root", vec![nested(11, "child", vec![service(12, "leaf", None)])]);
        let categories = vec![Category {
            services: vec![tree],
            ..category(1, "A")
        }];

        let catalog = organize(categories, Vec::new()).unwrap();

        let root = &catalog.categories[0].services[0];
        assert_eq!(root.depth, 0);
        assert_eq!(root.children[0].depth, 1);
        assert_eq!(root.children[0].children[0].depth, 2);
        assert_eq!(catalog.service_count(), 3);
    }

    #[test]
    fn nesting_past_the_depth_bound_is_a_data_integrity_error() {
        let mut tree = service(1000, "leaf", None);
        for id in 0..MAX_SERVICE_DEPTH as i64 {
            tree = nested(id, "wrap", vec![tree]);
        }
        let categories = vec![Category {
            services: vec![tree],
            ..category(1, "A")
        }];

        let err = organize(categories, Vec::new()).unwrap_err();
        assert!(matches!(err, PortalError::DataIntegrity(_)));
    }

    #[test]
    fn first_toggle_expands_and_collapse_does_not_cascade() {
        let mut expansion = ExpansionState::default();
        let parent = EntityRef::category(1);
        let child = EntityRef::service(10);

        assert!(expansion.toggle(parent));
        assert!(expansion.toggle(child));

        // collapsing the parent leaves the child's flag recorded
        assert!(!expansion.toggle(parent));
        assert!(expansion.is_expanded(child));

        assert!(expansion.toggle(parent));
        assert!(expansion.is_expanded(child));
    }
}
