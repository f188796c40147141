//! Per-application view of the reaper.

use crate::interner::AppIdentity;
use crate::reaper::Reaper;
use crate::secrets::AppSecret;
use crate::transfer::TransferHandle;

/// Reaper operations on behalf of one application.
///
/// Obtained from [`Reaper::app`]. The binding layer creates one per
/// connected app, so the app never names itself in a call.
pub struct AppClient<'a> {
    reaper: &'a mut Reaper,
    app: AppIdentity,
}

impl<'a> AppClient<'a> {
    pub(crate) fn new(reaper: &'a mut Reaper, app: AppIdentity) -> Self {
        Self { reaper, app }
    }

    /// The bound application's canonical URL.
    pub fn url(&self) -> &str {
        self.app.as_str()
    }

    pub fn create_reference(&mut self, source_id: u32, target_id: u32) {
        let app = self.app.clone();
        self.reaper.create_reference(app.as_str(), source_id, target_id);
    }

    pub fn drop_node(&mut self, node_id: u32) {
        let app = self.app.clone();
        self.reaper.drop_node(app.as_str(), node_id);
    }

    pub fn start_transfer(&mut self, node_id: u32) -> Option<TransferHandle> {
        let app = self.app.clone();
        self.reaper.start_transfer(app.as_str(), node_id)
    }

    /// Complete a transfer into this application's namespace.
    pub fn complete_transfer(&mut self, handle: TransferHandle, dest_node_id: u32) {
        let secret = self.application_secret();
        self.reaper.complete_transfer(handle, secret, dest_node_id);
    }

    pub fn application_secret(&mut self) -> AppSecret {
        let app = self.app.clone();
        self.reaper.get_application_secret(app.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::reaper::Reaper;

    #[test]
    fn test_app_client_operations() {
        let mut reaper = Reaper::default();
        reaper.set_is_root("app_a", true);

        let mut client = reaper.app("app_a");
        assert_eq!(client.url(), "app_a");
        client.create_reference(1, 2);
        client.create_reference(3, 4);
        client.drop_node(3);
        let handle = client.start_transfer(1).unwrap();

        reaper.app("app_b").complete_transfer(handle, 9);

        // app_b owns the source now but nothing roots it, so it was swept
        // and the edge with it
        assert!(reaper.dump_nodes().is_empty());
    }

    #[test]
    fn test_app_client_delivers_to_itself() {
        let mut reaper = Reaper::default();
        reaper.set_is_root("app_b", true);
        reaper.app("app_a").create_reference(1, 2);
        let handle = reaper.app("app_a").start_transfer(1).unwrap();

        reaper.app("app_b").complete_transfer(handle, 9);

        let dump = reaper.dump_nodes();
        assert_eq!(dump.len(), 2);
        assert!(dump.iter().any(|r| r.app_url == "app_b" && r.node_id == 9 && r.is_source));
        reaper.check_invariants().unwrap();
    }

    #[test]
    fn test_app_client_secret_matches_reaper() {
        let mut reaper = Reaper::default();
        let via_client = reaper.app("app_a").application_secret();
        assert_eq!(reaper.get_application_secret("app_a"), via_client);
    }
}
