mod common;

use common::{make_user, setup_pool};
use murmur::store::{messages, rooms};
use sqlx::SqlitePool;
use uuid::Uuid;

async fn membership_count(pool: &SqlitePool, room_id: Uuid, user_id: &str) -> i64 {
    sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM memberships WHERE room_id=? AND user_id=?")
        .bind(room_id.to_string())
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
        .0
}

async fn receipt_count(pool: &SqlitePool, message_id: &str, user_id: &str) -> i64 {
    sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM read_receipts WHERE message_id=? AND user_id=?",
    )
    .bind(message_id)
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
    .0
}

#[tokio::test]
async fn creating_a_room_makes_the_creator_a_member() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;

    let room = rooms::create_room(&pool, Some("den"), &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();

    assert!(rooms::is_member(&pool, room_id, &alice.id).await.unwrap());
    let listed = rooms::rooms_for_user(&pool, &alice.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, room.id);
}

#[tokio::test]
async fn joining_twice_leaves_one_membership_row() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();

    assert!(rooms::add_member(&pool, room_id, &bob.id).await.unwrap());
    assert!(!rooms::add_member(&pool, room_id, &bob.id).await.unwrap());
    assert_eq!(membership_count(&pool, room_id, &bob.id).await, 1);
}

#[tokio::test]
async fn send_receipts_the_author_and_nobody_else() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();
    rooms::add_member(&pool, room_id, &bob.id).await.unwrap();

    let stored = messages::create_message(&pool, room_id, &alice.id, "hi").await.unwrap();
    let message_id = stored.id.to_string();

    assert_eq!(receipt_count(&pool, &message_id, &alice.id).await, 1);
    assert_eq!(receipt_count(&pool, &message_id, &bob.id).await, 0);

    let for_alice = messages::list_messages(&pool, room_id, &alice.id, 50, None).await.unwrap();
    assert!(for_alice[0].is_read);
    let for_bob = messages::list_messages(&pool, room_id, &bob.id, 50, None).await.unwrap();
    assert!(!for_bob[0].is_read);
    assert_eq!(for_bob[0].author_name, alice.username);
}

#[tokio::test]
async fn bulk_mark_room_read_skips_existing_and_own_messages() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();
    rooms::add_member(&pool, room_id, &bob.id).await.unwrap();

    for body in ["one", "two", "three"] {
        messages::create_message(&pool, room_id, &alice.id, body).await.unwrap();
    }
    let own = messages::create_message(&pool, room_id, &bob.id, "mine").await.unwrap();

    assert_eq!(messages::bulk_mark_room_read(&pool, &bob.id, room_id).await.unwrap(), 3);
    assert_eq!(messages::bulk_mark_room_read(&pool, &bob.id, room_id).await.unwrap(), 0);
    // bob's own message was receipted at send time, exactly once
    assert_eq!(receipt_count(&pool, &own.id.to_string(), &bob.id).await, 1);

    let for_bob = messages::list_messages(&pool, room_id, &bob.id, 50, None).await.unwrap();
    assert!(for_bob.iter().all(|m| m.is_read));
}

#[tokio::test]
async fn marking_one_message_read_twice_is_a_noop() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();
    rooms::add_member(&pool, room_id, &bob.id).await.unwrap();

    let stored = messages::create_message(&pool, room_id, &alice.id, "hi").await.unwrap();
    assert!(messages::mark_message_read(&pool, &bob.id, stored.id).await.unwrap());
    assert!(!messages::mark_message_read(&pool, &bob.id, stored.id).await.unwrap());
    assert_eq!(receipt_count(&pool, &stored.id.to_string(), &bob.id).await, 1);
}

#[tokio::test]
async fn soft_deleted_messages_drop_out_of_history_and_receipts() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();
    rooms::add_member(&pool, room_id, &bob.id).await.unwrap();

    let keep = messages::create_message(&pool, room_id, &alice.id, "keep").await.unwrap();
    let gone = messages::create_message(&pool, room_id, &alice.id, "gone").await.unwrap();
    assert!(messages::soft_delete_message(&pool, gone.id).await.unwrap());

    let listed = messages::list_messages(&pool, room_id, &bob.id, 50, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keep.id.to_string());

    assert_eq!(messages::bulk_mark_room_read(&pool, &bob.id, room_id).await.unwrap(), 1);
    assert!(!messages::mark_message_read(&pool, &bob.id, gone.id).await.unwrap());
}

#[tokio::test]
async fn pagination_pages_are_disjoint_and_gapless() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();

    // distinct timestamps so the cursor cleanly splits the pages
    for i in 0..120i64 {
        sqlx::query(
            "INSERT INTO messages (id,room_id,author_id,content,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(room.id.clone())
        .bind(&alice.id)
        .bind(format!("msg {i}"))
        .bind(1_000 + i)
        .execute(&pool)
        .await
        .unwrap();
    }

    let first = messages::list_messages(&pool, room_id, &alice.id, 50, None).await.unwrap();
    assert_eq!(first.len(), 50);
    assert_eq!(first[0].created_at, 1_119);
    assert_eq!(first[49].created_at, 1_070);
    assert!(first.windows(2).all(|w| w[0].created_at > w[1].created_at));

    let cursor = first[49].created_at;
    let second = messages::list_messages(&pool, room_id, &alice.id, 50, Some(cursor))
        .await
        .unwrap();
    assert_eq!(second.len(), 50);
    assert_eq!(second[0].created_at, 1_069);
    assert_eq!(second[49].created_at, 1_020);

    let mut ids: Vec<&str> = first.iter().chain(&second).map(|m| m.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 100);
}

#[tokio::test]
async fn equal_timestamps_order_by_insertion() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();

    for i in 0..3 {
        sqlx::query(
            "INSERT INTO messages (id,room_id,author_id,content,created_at) VALUES (?,?,?,?,?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(room.id.clone())
        .bind(&alice.id)
        .bind(format!("msg {i}"))
        .bind(1_000)
        .execute(&pool)
        .await
        .unwrap();
    }

    let listed = messages::list_messages(&pool, room_id, &alice.id, 50, None).await.unwrap();
    let bodies: Vec<&str> = listed.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(bodies, ["msg 2", "msg 1", "msg 0"]);
}

#[tokio::test]
async fn last_member_leaving_deletes_the_room_and_its_messages() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, Some("doomed"), &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();
    rooms::add_member(&pool, room_id, &bob.id).await.unwrap();
    messages::create_message(&pool, room_id, &alice.id, "hi").await.unwrap();
    messages::bulk_mark_room_read(&pool, &bob.id, room_id).await.unwrap();

    assert!(!rooms::remove_member(&pool, room_id, &alice.id).await.unwrap());
    assert!(rooms::get_room(&pool, room_id).await.unwrap().is_some());

    assert!(rooms::remove_member(&pool, room_id, &bob.id).await.unwrap());
    assert!(rooms::get_room(&pool, room_id).await.unwrap().is_none());

    let (messages_left,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM messages WHERE room_id=?")
            .bind(room.id.clone())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(messages_left, 0);
    let (receipts_left,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM read_receipts")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(receipts_left, 0);
}

#[tokio::test]
async fn removing_an_absent_member_leaves_other_members_alone() {
    let pool = setup_pool().await;
    let alice = make_user(&pool, "alice").await;
    let bob = make_user(&pool, "bob").await;

    let room = rooms::create_room(&pool, None, &alice.id).await.unwrap();
    let room_id = Uuid::parse_str(&room.id).unwrap();

    // bob never joined; his "leave" must not cascade
    assert!(!rooms::remove_member(&pool, room_id, &bob.id).await.unwrap());
    assert!(rooms::get_room(&pool, room_id).await.unwrap().is_some());
}
