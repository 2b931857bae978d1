use super::PageNode;

/// result of matching a request path against the page tree
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedRoute<'a> {
    /// a page matched, with its ancestor chain ordered root to leaf
    Found {
        page: &'a PageNode,
        ancestors: Vec<&'a PageNode>,
    },

    /// no page anywhere in the tree matches the path
    NotFound,
}

/// Matches a request path against the page tree.
///
/// Pages are scanned in configuration order, parents before their
/// children, and the first exact match wins. Paths compare byte for
/// byte, so `/about` and `/about/` are different pages. The tree is
/// never modified, the ancestor chain is produced as output so that
/// concurrent requests can share one snapshot.
pub fn resolve<'a>(pages: &'a [PageNode], request_path: &str) -> ResolvedRoute<'a> {
    let mut ancestors = Vec::new();

    match find_match(pages, request_path, &mut ancestors) {
        Some(page) => ResolvedRoute::Found { page, ancestors },
        None => ResolvedRoute::NotFound,
    }
}

fn find_match<'a>(
    nodes: &'a [PageNode],
    request_path: &str,
    ancestors: &mut Vec<&'a PageNode>,
) -> Option<&'a PageNode> {
    for node in nodes {
        if node.path == request_path {
            return Some(node);
        }

        ancestors.push(node);
        if let Some(found) = find_match(&node.children, request_path, ancestors) {
            return Some(found);
        }
        ancestors.pop();
    }

    None
}

/// Visits every page in the tree in the same pre-order traversal the
/// resolver scans in.
pub fn walk<'a>(nodes: &'a [PageNode], visit: &mut dyn FnMut(&'a PageNode)) {
    for node in nodes {
        visit(node);
        walk(&node.children, visit);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn site_pages() -> Vec<PageNode> {
        serde_json::from_value(serde_json::json!([
            { "path": "/", "template": "index.tt" },
            {
                "path": "/about",
                "template": "about.tt",
                "pages": [{ "path": "/about/team", "template": "team.tt" }],
            },
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolves_root_page_without_ancestors() {
        let pages = site_pages();

        let ResolvedRoute::Found { page, ancestors } = resolve(&pages, "/about") else {
            panic!("expected a match for /about");
        };

        assert_eq!(page.template, "about.tt");
        assert!(ancestors.is_empty());
    }

    #[test]
    fn test_resolves_child_page_with_ancestor_chain() {
        let pages = site_pages();

        let ResolvedRoute::Found { page, ancestors } = resolve(&pages, "/about/team") else {
            panic!("expected a match for /about/team");
        };

        assert_eq!(page.template, "team.tt");
        assert_eq!(ancestors.len(), 1);
        assert_eq!(ancestors[0].path, "/about");
    }

    #[test]
    fn test_resolves_at_arbitrary_depth() {
        let pages: Vec<PageNode> = serde_json::from_value(serde_json::json!([{
            "path": "/docs",
            "template": "docs.tt",
            "pages": [{
                "path": "/docs/guide",
                "template": "guide.tt",
                "pages": [{ "path": "/docs/guide/setup", "template": "setup.tt" }],
            }],
        }]))
        .unwrap();

        let ResolvedRoute::Found { page, ancestors } = resolve(&pages, "/docs/guide/setup")
        else {
            panic!("expected a match for /docs/guide/setup");
        };

        assert_eq!(page.template, "setup.tt");
        let ancestor_paths: Vec<_> = ancestors.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(ancestor_paths, vec!["/docs", "/docs/guide"]);
    }

    #[test]
    fn test_unknown_path_is_not_found() {
        let pages = site_pages();

        assert_eq!(resolve(&pages, "/missing"), ResolvedRoute::NotFound);
    }

    #[test]
    fn test_empty_tree_resolves_nothing() {
        assert_eq!(resolve(&[], "/"), ResolvedRoute::NotFound);
    }

    #[test]
    fn test_matching_is_exact() {
        let pages = site_pages();

        assert_eq!(resolve(&pages, "/About"), ResolvedRoute::NotFound);
        assert_eq!(resolve(&pages, "/about/"), ResolvedRoute::NotFound);
        assert_eq!(resolve(&pages, "about"), ResolvedRoute::NotFound);
    }

    #[test]
    fn test_resolution_is_idempotent_and_pure() {
        let pages = site_pages();
        let snapshot = pages.clone();

        let first = resolve(&pages, "/about/team");
        let second = resolve(&pages, "/about/team");

        assert_eq!(first, second);
        assert_eq!(pages, snapshot);
    }

    #[test]
    fn test_walk_visits_pages_in_configuration_order() {
        let pages = site_pages();
        let mut visited = Vec::new();

        walk(&pages, &mut |page| visited.push(page.path.as_str()));

        assert_eq!(visited, vec!["/", "/about", "/about/team"]);
    }
}
