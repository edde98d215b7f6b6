use hearth_shared::constants::CALL_LOGS_KEY;
use hearth_shared::types::CallLogId;

use crate::data::DataStore;
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::{CallLog, NewCallLog};

impl DataStore {
    /// Call history, newest first.
    pub fn call_logs(&self) -> Result<Vec<CallLog>> {
        let mut logs: Vec<CallLog> = self.load(CALL_LOGS_KEY)?;
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(logs)
    }

    /// Calls whose counterpart's username contains `query`, ignoring case.
    /// An empty query matches everything.
    pub fn search_call_logs(&self, query: &str) -> Result<Vec<CallLog>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.call_logs();
        }

        let profiles = self.profiles()?;
        Ok(self
            .call_logs()?
            .into_iter()
            .filter(|log| {
                profiles
                    .iter()
                    .find(|p| p.id == log.user_id)
                    .is_some_and(|p| p.username.to_lowercase().contains(&needle))
            })
            .collect())
    }

    pub fn record_call(&self, new: NewCallLog) -> Result<CallLog> {
        let _w = self.writer()?;
        let log = CallLog {
            id: CallLogId::new(),
            user_id: new.user_id,
            kind: new.kind,
            direction: new.direction,
            timestamp: new.timestamp,
            duration_secs: new.duration_secs,
        };
        let mut logs: Vec<CallLog> = self.load(CALL_LOGS_KEY)?;
        logs.push(log.clone());
        self.save(CALL_LOGS_KEY, &logs)?;

        self.publish(StoreEvent::CallLogged { call_id: log.id });
        Ok(log)
    }

    pub fn clear_call_logs(&self) -> Result<()> {
        let _w = self.writer()?;
        self.save::<CallLog>(CALL_LOGS_KEY, &[])?;
        self.publish(StoreEvent::CallLogsCleared);
        Ok(())
    }
}
