// Procedure definitions grouped by namespace, mirroring the dispatch names
// exposed under /rpc/{name}.

pub(crate) mod organizations;
pub(crate) mod projects;
pub(crate) mod system;

use crate::procedure::ProcedureRouter;

pub fn build_registry() -> ProcedureRouter {
    let mut router = ProcedureRouter::default();
    system::register(&mut router);
    organizations::register(&mut router);
    projects::register(&mut router);
    router
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_contains_the_full_surface() {
        let registry = build_registry();
        for name in [
            "health",
            "helloWorld",
            "user.getProfile",
            "organizations.list",
            "organizations.searchMembers",
            "organizations.stats",
            "project.create",
            "project.list",
        ] {
            assert!(registry.get(name).is_some(), "missing procedure {name}");
        }
        assert!(registry.get("organizations.unknown").is_none());
    }
}
