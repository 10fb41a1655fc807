use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::{new_id, Database};
use super::users::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A chat partner and the latest message exchanged with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: UserSummary,
    pub last_message: Message,
}

impl Database {
    pub fn create_message(&self, sender_id: &str, receiver_id: &str, content: &str) -> rusqlite::Result<Message> {
        let message = Message {
            id: new_id(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        self.conn().execute(
            "INSERT INTO messages (id, sender_id, receiver_id, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.sender_id,
                message.receiver_id,
                message.content,
                message.timestamp
            ],
        )?;
        Ok(message)
    }

    /// Messages between the two users in either direction, oldest first.
    pub fn conversation(&self, a: &str, b: &str) -> rusqlite::Result<Vec<Message>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, sender_id, receiver_id, content, timestamp FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2) OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY timestamp ASC, rowid ASC",
        )?;

        let messages = stmt.query_map([a, b], |row| {
            Ok(Message {
                id: row.get(0)?,
                sender_id: row.get(1)?,
                receiver_id: row.get(2)?,
                content: row.get(3)?,
                timestamp: row.get(4)?,
            })
        })?;
        messages.collect()
    }

    /// One entry per chat partner, most recently active first.
    pub fn conversations(&self, user_id: &str) -> rusqlite::Result<Vec<Conversation>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.id, m.sender_id, m.receiver_id, m.content, m.timestamp,
                    u.id, u.name, u.email, u.company_name
             FROM messages m
             JOIN users u ON u.id = CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
             WHERE m.rowid IN (
                SELECT MAX(rowid) FROM messages
                WHERE sender_id = ?1 OR receiver_id = ?1
                GROUP BY CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END
             )
             ORDER BY m.timestamp DESC, m.rowid DESC",
        )?;

        let conversations = stmt.query_map([user_id], |row| {
            Ok(Conversation {
                last_message: Message {
                    id: row.get(0)?,
                    sender_id: row.get(1)?,
                    receiver_id: row.get(2)?,
                    content: row.get(3)?,
                    timestamp: row.get(4)?,
                },
                user: UserSummary {
                    id: row.get(5)?,
                    name: row.get(6)?,
                    email: row.get(7)?,
                    company_name: row.get(8)?,
                },
            })
        })?;
        conversations.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::users::tests::seed_user;
    use crate::utils::enums::Role;

    #[test]
    fn conversation_is_pairwise_and_ascending() {
        let db = Database::open_in_memory().unwrap();
        let s = seed_user(&db, "s@x.com", Role::Student);
        let r = seed_user(&db, "r@x.com", Role::Recruiter);
        let other = seed_user(&db, "o@x.com", Role::Student);

        db.create_message(&s.id, &r.id, "Hello").unwrap();
        db.create_message(&r.id, &s.id, "Hi there").unwrap();
        db.create_message(&other.id, &r.id, "Unrelated").unwrap();

        let thread = db.conversation(&r.id, &s.id).unwrap();
        let contents: Vec<_> = thread.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello", "Hi there"]);
    }

    #[test]
    fn conversations_list_latest_per_partner() {
        let db = Database::open_in_memory().unwrap();
        let s = seed_user(&db, "s@x.com", Role::Student);
        let r = seed_user(&db, "r@x.com", Role::Recruiter);
        let other = seed_user(&db, "o@x.com", Role::Student);

        db.create_message(&s.id, &r.id, "Hello").unwrap();
        db.create_message(&r.id, &s.id, "Hi there").unwrap();
        db.create_message(&other.id, &r.id, "Question").unwrap();

        let list = db.conversations(&r.id).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].user.id, other.id);
        assert_eq!(list[0].last_message.content, "Question");
        assert_eq!(list[1].user.id, s.id);
        assert_eq!(list[1].last_message.content, "Hi there");
    }
}
