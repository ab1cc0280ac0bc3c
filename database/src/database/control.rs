use std::{thread, time::Duration};

use super::{
    commands::{Control, DatabaseCommandResponse},
    database::Database,
};

pub enum DatabaseControlAction {
    Continue,
    Exit,
}

impl Database {
    pub(super) fn run_control(
        &self,
        control: Control,
    ) -> (DatabaseCommandResponse, DatabaseControlAction) {
        match control {
            Control::Shutdown => self.shutdown(),
            Control::Sleep(duration) => self.sleep(duration),
        }
    }

    fn shutdown(&self) -> (DatabaseCommandResponse, DatabaseControlAction) {
        log::info!(
            "Shutting down database [Collection: {}, Documents: {}, OpenCursors: {}]",
            self.options.collection,
            self.table.len(),
            self.table.open_cursors()
        );

        (
            DatabaseCommandResponse::Control("Successfully shutdown database".to_string()),
            DatabaseControlAction::Exit,
        )
    }

    fn sleep(&self, duration: Duration) -> (DatabaseCommandResponse, DatabaseControlAction) {
        thread::sleep(duration);

        let response = DatabaseCommandResponse::Control(format!(
            "Successfully slept database for {}ms",
            duration.as_millis()
        ));

        (response, DatabaseControlAction::Continue)
    }
}
