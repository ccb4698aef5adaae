#![allow(clippy::unwrap_used)]


use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mock::{Call, MockMessenger};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use super::*;
use crate::{
    action::{AnswerOptions, TextOptions},
    event::{ButtonPress, InboundMessage},
    messenger::{EditOptions, Markup, SendOptions},
    script::Sequence,
    single_button_markup,
};

const CHAT: i64 = 123;

fn engine() -> Engine<MockMessenger> {
    Engine::new(MockMessenger::new())
}

fn key(message_id: i32) -> CorrelationKey {
    CorrelationKey::new(CHAT, message_id)
}

fn reply(message_id: i32, reply_to: i32, text: &str) -> InboundMessage {
    InboundMessage {
        chat_id: CHAT,
        message_id,
        reply_to: Some(reply_to),
        from: Some(7),
        text: Some(text.to_string()),
    }
}

fn press(message_id: i32, data: &str) -> ButtonPress {
    ButtonPress {
        query_id: format!("query-{data}"),
        chat_id: CHAT,
        message_id,
        data: Some(data.to_string()),
        from: 7,
    }
}

fn yeah_menu() -> InlineKeyboardMarkup {
    single_button_markup!(InlineKeyboardButton::callback("Yeah!", "YEAH"))
}

fn force_reply(reply_to: Option<i32>) -> SendOptions {
    SendOptions {
        reply_to_message_id: reply_to,
        reply_markup: Some(Markup::ForceReply { selective: false }),
        ..Default::default()
    }
}

fn new_generator() -> BoxedScript {
    Sequence::new()
        .then(|input| {
            assert_eq!(input.data(), Some("YEAH"));
            Action::text_message("New generator!").into()
        })
        .then(|input| {
            let name = input.text().unwrap_or_default();
            Step::finish(Action::terminate_with(format!("Bye, {name}")))
        })
        .boxed()
}

fn dialogue() -> BoxedScript {
    Sequence::new()
        .then(|_| {
            Action::text_message_with("Hi", TextOptions::parse_mode(ParseMode::MarkdownV2)).into()
        })
        .then(|_| Action::text_message("Ok").into())
        .then(|_| vec![Action::delete_message(), Action::inline_menu("It works!", yeah_menu())].into())
        .then(|_| {
            vec![
                Action::answer_query(AnswerOptions::text("Nice!")),
                Action::switch_script(new_generator()),
            ]
            .into()
        })
        .boxed()
}

fn menu_script(stages: Vec<Step>) -> BoxedScript {
    stages
        .into_iter()
        .fold(
            Sequence::new().then(|_| Action::inline_menu("Pick one", yeah_menu()).into()),
            |seq, step| seq.then(move |_| step),
        )
        .boxed()
}

fn counting_recover(
    counter: Arc<AtomicUsize>,
) -> impl FnMut(&EngineError) -> Option<Step> + Send + 'static {
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        None
    }
}

#[tokio::test]
async fn test_full_dialogue() {
    let engine = engine();

    // start: forced reply carrying the script's parse mode
    let started = engine.reply().start(CHAT, dialogue()).await.unwrap();
    assert_eq!(started, key(1));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Hi".into(),
            options: SendOptions {
                parse_mode: Some(ParseMode::MarkdownV2),
                ..force_reply(None)
            },
        })
    );
    assert!(engine.is_awaiting_reply(&key(1)).unwrap());

    // reply moves the registration to the new question
    let outcome = engine.reply().handle(&reply(10, 1, "Bob")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::reply(key(2))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Ok".into(),
            options: force_reply(Some(10)),
        })
    );
    assert!(!engine.is_awaiting_reply(&key(1)).unwrap());
    assert!(engine.is_awaiting_reply(&key(2)).unwrap());

    // delete + menu: reply flow hands over to menu flow
    let outcome = engine.reply().handle(&reply(11, 2, "go")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(3))));
    let calls = engine.messenger().calls();
    assert_eq!(
        calls[2],
        Call::Delete {
            chat_id: CHAT,
            message_id: 11
        }
    );
    assert_eq!(
        calls[3],
        Call::Send {
            chat_id: CHAT,
            text: "It works!".into(),
            options: SendOptions {
                reply_to_message_id: Some(11),
                reply_markup: Some(Markup::Inline(yeah_menu())),
                ..Default::default()
            },
        }
    );
    assert!(!engine.is_awaiting_reply(&key(2)).unwrap());
    assert!(engine.is_awaiting_menu(&key(3)).unwrap());
    assert_eq!(engine.active().unwrap(), 1);

    // press: answer, switch, and the replacement takes the same press
    let outcome = engine.menu().handle(&press(3, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::reply(key(4))));
    let calls = engine.messenger().calls();
    assert_eq!(
        calls[4],
        Call::Answer {
            query_id: "query-YEAH".into(),
            options: AnswerOptions::text("Nice!"),
        }
    );
    assert_eq!(
        calls[5],
        Call::Send {
            chat_id: CHAT,
            text: "New generator!".into(),
            options: force_reply(Some(3)),
        }
    );
    assert!(!engine.is_awaiting_menu(&key(3)).unwrap());
    assert!(engine.is_awaiting_reply(&key(4)).unwrap());

    // final reply terminates with a closing message
    let outcome = engine.reply().handle(&reply(12, 4, "Bob")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Bye, Bob".into(),
            options: SendOptions {
                reply_to_message_id: Some(12),
                ..Default::default()
            },
        })
    );
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_reply_start_rejects_wrong_first_action() {
    let engine = engine();
    let thrown = Arc::new(AtomicUsize::new(0));
    let script = Sequence::new()
        .then(|_| Action::inline_menu("Menu", yeah_menu()).into())
        .on_error(counting_recover(thrown.clone()))
        .boxed();

    let err = engine.reply().start(CHAT, script).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidFirstAction {
            flow: Flow::Reply,
            expected: ActionKind::TextMessage,
            ..
        }
    ));
    assert!(err.is_protocol_violation());
    assert_eq!(thrown.load(Ordering::SeqCst), 1);
    assert!(engine.messenger().calls().is_empty());
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_start_rejects_batches_and_early_finish() {
    let engine = engine();

    let script = Sequence::new()
        .then(|_| vec![Action::text_message("a"), Action::text_message("b")].into())
        .boxed();
    let err = engine.reply().start(CHAT, script).await.unwrap_err();
    match err {
        EngineError::InvalidFirstAction { got, .. } => assert_eq!(got, "TextMessage, TextMessage"),
        other => panic!("unexpected error {other:?}"),
    }

    let script = Sequence::new().then(|_| Step::done()).boxed();
    let err = engine.menu().start(CHAT, script).await.unwrap_err();
    assert!(matches!(err, EngineError::FinishedBeforeStart(Flow::Menu)));

    let script = Sequence::new().then(|_| Action::text_message("Hi").into()).boxed();
    let err = engine.menu().start(CHAT, script).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidFirstAction {
            flow: Flow::Menu,
            ..
        }
    ));
    assert!(engine.messenger().calls().is_empty());
}

#[tokio::test]
async fn test_uncorrelated_events_are_ignored() {
    let engine = engine();
    engine.reply().start(CHAT, dialogue()).await.unwrap();

    let plain = InboundMessage {
        reply_to: None,
        ..reply(10, 1, "hello")
    };
    assert_eq!(engine.reply().handle(&plain).await.unwrap(), Outcome::Ignored);
    assert_eq!(
        engine.reply().handle(&reply(10, 99, "hello")).await.unwrap(),
        Outcome::Ignored
    );
    // a reply-pending key is not a menu
    assert_eq!(
        engine.menu().handle(&press(1, "YEAH")).await.unwrap(),
        Outcome::Ignored
    );
    assert_eq!(engine.messenger().calls().len(), 1);
    assert!(engine.is_awaiting_reply(&key(1)).unwrap());
}

#[tokio::test]
async fn test_busy_script_is_not_resumed_twice() {
    let engine = engine();
    engine.reply().start(CHAT, dialogue()).await.unwrap();

    let checkout = engine.lock().unwrap().checkout_reply(&key(1));
    assert!(matches!(checkout, crate::index::Checkout::Ready(_)));

    assert_eq!(
        engine.reply().handle(&reply(10, 1, "Bob")).await.unwrap(),
        Outcome::Busy
    );
    assert!(engine.is_awaiting_reply(&key(1)).unwrap());
    assert_eq!(engine.messenger().calls().len(), 1);
}

#[tokio::test]
async fn test_reply_completion_removes_entry() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::text_message("Name?").into())
        .then(|_| Step::done())
        .boxed();
    engine.reply().start(CHAT, script).await.unwrap();

    let outcome = engine.reply().handle(&reply(10, 1, "Bob")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert!(!engine.is_awaiting_reply(&key(1)).unwrap());
    assert_eq!(engine.messenger().calls().len(), 1);
}

#[tokio::test]
async fn test_reply_terminate_skips_remaining_actions() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::text_message("Name?").into())
        .then(|_| vec![Action::terminate(), Action::text_message("never sent")].into())
        .boxed();
    engine.reply().start(CHAT, script).await.unwrap();

    let outcome = engine.reply().handle(&reply(10, 1, "Bob")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(engine.messenger().calls().len(), 1);
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_reply_delete_keeps_registration() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::text_message("Password?").into())
        .then(|_| Action::delete_message().into())
        .boxed();
    engine.reply().start(CHAT, script).await.unwrap();

    let outcome = engine.reply().handle(&reply(10, 1, "hunter2")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::reply(key(1))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Delete {
            chat_id: CHAT,
            message_id: 10
        })
    );
    assert!(engine.is_awaiting_reply(&key(1)).unwrap());
}

#[tokio::test]
async fn test_reply_rejects_menu_only_actions() {
    let engine = engine();
    let thrown = Arc::new(AtomicUsize::new(0));
    let script = Sequence::new()
        .then(|_| Action::text_message("Name?").into())
        .then(|_| Action::answer_query(AnswerOptions::default()).into())
        .on_error(counting_recover(thrown.clone()))
        .boxed();
    engine.reply().start(CHAT, script).await.unwrap();

    let err = engine
        .reply()
        .handle(&reply(10, 1, "Bob"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidAction {
            flow: Flow::Reply,
            kind: ActionKind::AnswerQuery
        }
    ));
    assert_eq!(thrown.load(Ordering::SeqCst), 1);
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_transport_failure_recovered_by_script() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::text_message("Name?").into())
        .then(|_| Action::text_message("Age?").into())
        .on_error(|err| {
            assert!(err.is_transport());
            Some(Action::text_message("Age, once more?").into())
        })
        .boxed();
    engine.reply().start(CHAT, script).await.unwrap();

    engine.messenger().fail_call(0);
    let outcome = engine.reply().handle(&reply(10, 1, "Bob")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::reply(key(2))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Age, once more?".into(),
            options: force_reply(Some(10)),
        })
    );
    assert_eq!(engine.active().unwrap(), 1);
}

#[tokio::test]
async fn test_unhandled_transport_failure_ends_script() {
    let engine = engine();
    engine.reply().start(CHAT, dialogue()).await.unwrap();

    engine.messenger().fail_call(0);
    let err = engine
        .reply()
        .handle(&reply(10, 1, "Bob"))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(engine.active().unwrap(), 0);

    engine.messenger().fail_call(0);
    let err = engine.menu().start(CHAT, menu_script(vec![])).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_start_retries_with_recovered_first_step() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::text_message("Name?").into())
        .on_error(|err| {
            assert!(err.is_transport());
            Some(Action::text_message("Name, please?").into())
        })
        .boxed();

    engine.messenger().fail_call(0);
    let started = engine.reply().start(CHAT, script).await.unwrap();
    assert_eq!(started, key(1));
    assert_eq!(
        engine.messenger().calls(),
        vec![Call::Send {
            chat_id: CHAT,
            text: "Name, please?".into(),
            options: force_reply(None),
        }]
    );
    assert!(engine.is_awaiting_reply(&key(1)).unwrap());

    // the recovered step is validated like the first one
    let thrown = Arc::new(AtomicUsize::new(0));
    let counter = thrown.clone();
    let script = Sequence::new()
        .then(|_| Action::inline_menu("Pick one", yeah_menu()).into())
        .on_error(move |err| {
            counter.fetch_add(1, Ordering::SeqCst);
            err.is_transport()
                .then(|| Action::text_message("Not a menu").into())
        })
        .boxed();

    engine.messenger().fail_call(0);
    let err = engine.menu().start(CHAT, script).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidFirstAction {
            flow: Flow::Menu,
            expected: ActionKind::InlineMenu,
            ..
        }
    ));
    assert_eq!(thrown.load(Ordering::SeqCst), 2);
    assert_eq!(engine.messenger().calls().len(), 1);
    assert_eq!(engine.active().unwrap(), 1);
}

#[tokio::test]
async fn test_menu_start_recovers_failed_send() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::inline_menu("Pick one", yeah_menu()).into())
        .on_error(|_| Some(Action::inline_menu("Pick one, again", yeah_menu()).into()))
        .boxed();

    engine.messenger().fail_call(0);
    let started = engine.menu().start(CHAT, script).await.unwrap();
    assert_eq!(started, key(1));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Pick one, again".into(),
            options: SendOptions {
                reply_markup: Some(Markup::Inline(yeah_menu())),
                ..Default::default()
            },
        })
    );
    assert!(engine.is_awaiting_menu(&key(1)).unwrap());
}

#[tokio::test]
async fn test_menu_press_recovers_failed_answer() {
    let engine = engine();
    let script = Sequence::new()
        .then(|_| Action::inline_menu("Pick one", yeah_menu()).into())
        .then(|_| {
            vec![
                Action::answer_query(AnswerOptions::text("Nice!")),
                Action::update_menu(yeah_menu(), Some("Picked".into())),
            ]
            .into()
        })
        .on_error(|err| {
            assert!(err.is_transport());
            Some(Action::update_menu(yeah_menu(), Some("Picked, quietly".into())).into())
        })
        .boxed();
    engine.menu().start(CHAT, script).await.unwrap();

    engine.messenger().fail_call(0);
    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    let calls = engine.messenger().calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Picked, quietly".into(),
            options: EditOptions {
                parse_mode: None,
                keyboard: Some(yeah_menu()),
            },
        }
    );
    assert!(engine.is_awaiting_menu(&key(1)).unwrap());
}

#[tokio::test]
async fn test_failure_after_handoff_clears_both_keys() {
    let engine = engine();
    let script = menu_script(vec![vec![
        Action::text_message("Your name?"),
        Action::answer_query(AnswerOptions::default()),
    ]
    .into()]);
    engine.menu().start(CHAT, script).await.unwrap();

    // the handoff message goes out, the answer after it fails
    engine.messenger().fail_call(1);
    let err = engine.menu().handle(&press(1, "YEAH")).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Your name?".into(),
            options: force_reply(Some(1)),
        })
    );
    assert!(!engine.is_awaiting_menu(&key(1)).unwrap());
    assert!(!engine.is_awaiting_reply(&key(2)).unwrap());
    assert_eq!(engine.active().unwrap(), 0);
    assert_eq!(
        engine.reply().handle(&reply(10, 2, "Bob")).await.unwrap(),
        Outcome::Ignored
    );
}

#[tokio::test]
async fn test_switch_delivers_press_before_releasing_slot() {
    let engine = engine();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let shared = engine.clone();
    let replacement = Sequence::new()
        .then(move |input| {
            assert_eq!(input.data(), Some("YEAH"));
            // a concurrent press must not grab the replacement
            let checkout = shared.lock().unwrap().checkout_menu(&key(1));
            assert!(matches!(checkout, crate::index::Checkout::Busy));
            counter.fetch_add(1, Ordering::SeqCst);
            Action::answer_query(AnswerOptions::default()).into()
        })
        .boxed();
    let script = menu_script(vec![Step::finish(Action::switch_script(replacement))]);
    engine.menu().start(CHAT, script).await.unwrap();

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(engine.is_awaiting_menu(&key(1)).unwrap());
    assert_eq!(engine.active().unwrap(), 1);
}

#[tokio::test]
async fn test_menu_edits_in_place() {
    let engine = engine();
    let other = single_button_markup!(InlineKeyboardButton::callback("Nope", "NOPE"));
    let script = menu_script(vec![
        Action::update_menu(other.clone(), Some("Changed".into())).into(),
        Action::update_menu(other.clone(), None).into(),
        Action::inline_menu_with(
            "*Again*",
            yeah_menu(),
            TextOptions::parse_mode(ParseMode::MarkdownV2),
        )
        .into(),
    ]);

    let started = engine.menu().start(CHAT, script).await.unwrap();
    assert_eq!(started, key(1));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Send {
            chat_id: CHAT,
            text: "Pick one".into(),
            options: SendOptions {
                reply_markup: Some(Markup::Inline(yeah_menu())),
                ..Default::default()
            },
        })
    );

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Changed".into(),
            options: EditOptions {
                parse_mode: None,
                keyboard: Some(other.clone()),
            },
        })
    );

    engine.menu().handle(&press(1, "NOPE")).await.unwrap();
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditKeyboard {
            chat_id: CHAT,
            message_id: 1,
            keyboard: other,
        })
    );

    let outcome = engine.menu().handle(&press(1, "NOPE")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "*Again*".into(),
            options: EditOptions {
                parse_mode: Some(ParseMode::MarkdownV2),
                keyboard: Some(yeah_menu()),
            },
        })
    );
    assert!(engine.is_awaiting_menu(&key(1)).unwrap());
}

#[tokio::test]
async fn test_menu_terminate_edits_message() {
    let engine = engine();
    let script = menu_script(vec![vec![
        Action::answer_query(AnswerOptions::default()),
        Action::terminate_with("Done"),
    ]
    .into()]);
    engine.menu().start(CHAT, script).await.unwrap();

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Done".into(),
            options: EditOptions::default(),
        })
    );
    assert!(!engine.is_awaiting_menu(&key(1)).unwrap());
}

#[tokio::test]
async fn test_menu_completion_removes_entry() {
    let engine = engine();
    let script = menu_script(vec![Step::finish(Action::answer_query(AnswerOptions::text(
        "Bye",
    )))]);
    engine.menu().start(CHAT, script).await.unwrap();

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::Answer {
            query_id: "query-YEAH".into(),
            options: AnswerOptions::text("Bye"),
        })
    );
    assert_eq!(engine.active().unwrap(), 0);
}

#[tokio::test]
async fn test_menu_rejects_delete() {
    let engine = engine();
    let script = menu_script(vec![Action::delete_message().into()]);
    engine.menu().start(CHAT, script).await.unwrap();

    let err = engine.menu().handle(&press(1, "YEAH")).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidAction {
            flow: Flow::Menu,
            kind: ActionKind::DeleteMessage
        }
    ));
    assert!(!engine.is_awaiting_menu(&key(1)).unwrap());
}

#[tokio::test]
async fn test_switch_keeps_menu_key() {
    let engine = engine();
    let replacement = Sequence::new()
        .then(|input| {
            assert_eq!(input.data(), Some("YEAH"));
            Action::update_menu(yeah_menu(), Some("Switched".into())).into()
        })
        .then(|_| Step::finish(Action::terminate_with("Replacement done")))
        .boxed();
    let script = menu_script(vec![Step::finish(Action::switch_script(replacement))]);
    engine.menu().start(CHAT, script).await.unwrap();

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Switched".into(),
            options: EditOptions {
                parse_mode: None,
                keyboard: Some(yeah_menu()),
            },
        })
    );

    // the next press reaches the replacement, not the original
    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Replacement done".into(),
            options: EditOptions::default(),
        })
    );
}

#[tokio::test]
async fn test_switch_redispatches_once() {
    let engine = engine();
    let third = Sequence::new()
        .then(|_| Step::finish(Action::terminate_with("Third")))
        .boxed();
    let second = Sequence::new()
        .then(move |_| Step::finish(Action::switch_script(third)))
        .boxed();
    let script = menu_script(vec![Action::switch_script(second).into()]);
    engine.menu().start(CHAT, script).await.unwrap();

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Suspended(Binding::menu(key(1))));
    assert_eq!(engine.messenger().calls().len(), 1);

    let outcome = engine.menu().handle(&press(1, "YEAH")).await.unwrap();
    assert_eq!(outcome, Outcome::Finished);
    assert_eq!(
        engine.messenger().last_call(),
        Some(Call::EditText {
            chat_id: CHAT,
            message_id: 1,
            text: "Third".into(),
            options: EditOptions::default(),
        })
    );
}

#[tokio::test]
async fn test_expire_drops_waiting_scripts() {
    let engine = engine();
    engine.reply().start(CHAT, dialogue()).await.unwrap();
    engine.menu().start(CHAT, menu_script(vec![])).await.unwrap();

    assert_eq!(engine.expire(Duration::from_secs(60)).unwrap(), 0);
    assert_eq!(engine.expire(Duration::ZERO).unwrap(), 2);
    assert_eq!(engine.active().unwrap(), 0);
}
