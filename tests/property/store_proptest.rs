//! Property tests for the message store invariants

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use uuid::Uuid;

use teamchat::backend::messaging::{MemoryMessageStore, MessageStore, NewMessage, NewUser, PageRequest};
use teamchat::shared::messaging::reaction::{toggle_outcome, ReactionToggle};
use teamchat::shared::messaging::{MemberRole, MessageType};

const EMOJI: [&str; 3] = ["👍", "🎉", "❤️"];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

struct Seeded {
    store: MemoryMessageStore,
    group: Uuid,
    users: Vec<Uuid>,
}

async fn seed(user_count: usize) -> Seeded {
    let store = MemoryMessageStore::new();
    let group = store.create_group("general", false).await.expect("group").id;
    let mut users = Vec::new();
    for i in 0..user_count {
        let user = store
            .create_user(NewUser::new(format!("u{}@test.local", i), format!("User {}", i)))
            .await
            .expect("user");
        store.add_member(group, user.id, MemberRole::Member).await.expect("member");
        users.push(user.id);
    }
    Seeded { store, group, users }
}

async fn post(seeded: &Seeded, author: Uuid, content: String) -> Uuid {
    seeded
        .store
        .insert_message(
            NewMessage {
                group_id: seeded.group,
                author_id: author,
                kind: MessageType::Text,
                content,
                reply_to_id: None,
            },
            &[],
        )
        .await
        .expect("insert")
        .id
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Walking pages by cursor yields every message exactly once, newest
    /// first, tombstones included
    #[test]
    fn pagination_is_complete(
        count in 0usize..30,
        take in 1u32..8,
        deleted in proptest::collection::vec(any::<bool>(), 30),
    ) {
        let (walked, expected) = runtime().block_on(async {
            let seeded = seed(1).await;
            let mut posted = Vec::new();
            for i in 0..count {
                let id = post(&seeded, seeded.users[0], format!("m{}", i)).await;
                if deleted[i] {
                    seeded.store.soft_delete_message(id).await.expect("delete");
                }
                posted.push(id);
            }

            let mut walked = Vec::new();
            let mut cursor = None;
            loop {
                let page = seeded
                    .store
                    .list_messages(seeded.group, PageRequest { take, cursor })
                    .await
                    .expect("page");
                prop_assert!(page.len() <= take as usize);
                if page.is_empty() {
                    break;
                }
                cursor = page.last().map(|m| m.id);
                walked.extend(page.into_iter().map(|m| m.id));
            }
            posted.reverse();
            Ok((walked, posted))
        })?;
        prop_assert_eq!(walked, expected);
    }

    /// Toggling keeps at most one reaction per user, matching the toggle rules
    #[test]
    fn reactions_stay_exclusive(
        toggles in proptest::collection::vec((0usize..3, 0usize..3), 1..40),
    ) {
        let (rows, expected) = runtime().block_on(async {
            let seeded = seed(3).await;
            let message = post(&seeded, seeded.users[0], "react here".to_string()).await;

            let mut model: HashMap<Uuid, &str> = HashMap::new();
            for (user_index, emoji_index) in toggles {
                let user = seeded.users[user_index];
                let emoji = EMOJI[emoji_index];
                match toggle_outcome(model.get(&user).copied(), emoji) {
                    ReactionToggle::Removed => {
                        model.remove(&user);
                    }
                    ReactionToggle::Added | ReactionToggle::Replaced => {
                        model.insert(user, emoji);
                    }
                }
                seeded.store.toggle_reaction(message, user, emoji).await.expect("toggle");
            }

            let rows = seeded.store.get_message(message).await.expect("get").expect("exists").reactions;
            (rows, model)
        });

        let mut users = HashSet::new();
        for row in &rows {
            prop_assert!(users.insert(row.user_id), "duplicate reaction for {}", row.user_id);
            prop_assert_eq!(expected.get(&row.user_id).copied(), Some(row.emoji.as_str()));
        }
        prop_assert_eq!(rows.len(), expected.len());
    }

    /// Marking read receipts exactly the messages by others that were unread
    #[test]
    fn mark_read_covers_every_unread_message(
        authors in proptest::collection::vec(0usize..3, 0..25),
        reads in proptest::collection::vec(0usize..3, 0..6),
    ) {
        runtime().block_on(async {
            let seeded = seed(3).await;
            let mut read: HashSet<(Uuid, Uuid)> = HashSet::new();
            let mut by_author: Vec<(Uuid, Uuid)> = Vec::new();

            for (i, author_index) in authors.iter().enumerate() {
                let author = seeded.users[*author_index];
                let id = post(&seeded, author, format!("m{}", i)).await;
                by_author.push((id, author));

                // interleave reads with posting
                if let Some(reader_index) = reads.get(i) {
                    let reader = seeded.users[*reader_index];
                    let mut expected: Vec<Uuid> = by_author
                        .iter()
                        .filter(|(m, a)| *a != reader && !read.contains(&(*m, reader)))
                        .map(|(m, _)| *m)
                        .collect();
                    let mut marked = seeded.store.mark_group_read(seeded.group, reader).await.expect("read");
                    expected.sort();
                    marked.sort();
                    prop_assert_eq!(&marked, &expected);
                    read.extend(marked.into_iter().map(|m| (m, reader)));
                }
            }

            for user in &seeded.users {
                seeded.store.mark_group_read(seeded.group, *user).await.expect("read");
                let groups = seeded.store.groups_for_user(*user).await.expect("groups");
                prop_assert_eq!(groups[0].unread, 0);
            }
            Ok(())
        })?;
    }
}
