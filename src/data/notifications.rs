use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::database::{new_id, Database};
use crate::utils::enums::NotificationKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub message: String,
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, message, read, kind, created_at";

impl Notification {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Notification {
            id: row.get(0)?,
            recipient_id: row.get(1)?,
            message: row.get(2)?,
            read: row.get(3)?,
            kind: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl Database {
    pub fn create_notification(
        &self,
        recipient_id: &str,
        message: &str,
        kind: NotificationKind,
    ) -> rusqlite::Result<Notification> {
        let notification = Notification {
            id: new_id(),
            recipient_id: recipient_id.to_string(),
            message: message.to_string(),
            read: false,
            kind,
            created_at: Utc::now(),
        };

        self.conn().execute(
            &format!("INSERT INTO notifications ({NOTIFICATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                notification.id,
                notification.recipient_id,
                notification.message,
                notification.read,
                notification.kind,
                notification.created_at
            ],
        )?;
        Ok(notification)
    }

    pub fn notification_by_id(&self, id: &str) -> rusqlite::Result<Option<Notification>> {
        self.conn()
            .query_row(
                &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
                [id],
                Notification::from_row,
            )
            .optional()
    }

    /// Newest first.
    pub fn notifications_for(&self, recipient_id: &str) -> rusqlite::Result<Vec<Notification>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE recipient_id = ?1
             ORDER BY created_at DESC, rowid DESC"
        ))?;
        let notifications = stmt.query_map([recipient_id], Notification::from_row)?;
        notifications.collect()
    }

    pub fn mark_notification_read(&self, id: &str) -> rusqlite::Result<Option<Notification>> {
        let updated = self
            .conn()
            .execute("UPDATE notifications SET read = 1 WHERE id = ?1", [id])?;
        if updated == 0 {
            return Ok(None);
        }
        self.notification_by_id(id)
    }

    /// Returns how many notifications flipped to read.
    pub fn mark_all_notifications_read(&self, recipient_id: &str) -> rusqlite::Result<usize> {
        self.conn().execute(
            "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
            [recipient_id],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::users::tests::seed_user;
    use crate::utils::enums::Role;

    #[test]
    fn read_flags() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "s@x.com", Role::Student);

        let first = db
            .create_notification(&user.id, "Application received", NotificationKind::Application)
            .unwrap();
        db.create_notification(&user.id, "New message", NotificationKind::Message)
            .unwrap();

        let listed = db.notifications_for(&user.id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].message, "New message");
        assert!(listed.iter().all(|n| !n.read));

        assert!(db.mark_notification_read(&first.id).unwrap().unwrap().read);
        assert_eq!(db.mark_all_notifications_read(&user.id).unwrap(), 1);
        assert_eq!(db.mark_all_notifications_read(&user.id).unwrap(), 0);
        assert!(db.mark_notification_read("missing").unwrap().is_none());
    }

    #[test]
    fn kind_serializes_as_type() {
        let db = Database::open_in_memory().unwrap();
        let user = seed_user(&db, "s@x.com", Role::Student);
        let n = db
            .create_notification(&user.id, "Posted", NotificationKind::Job)
            .unwrap();
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "job");
        assert_eq!(json["recipientId"], user.id);
    }
}
