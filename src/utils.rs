#[macro_export]
macro_rules! single_button_markup {
    ($button:expr) => {
        ::teloxide::types::InlineKeyboardMarkup {
            inline_keyboard: vec![vec![$button]],
        }
    };
}

#[macro_export]
macro_rules! stacked_buttons_markup {
    ($( $button:expr ),+) => {
        ::teloxide::types::InlineKeyboardMarkup {
            inline_keyboard: vec![
                $(
                    vec![$button],
                )*
            ],
        }
    };
}

#[macro_export]
macro_rules! buttons_markup {
    ($( $buttons:expr ),+) => {
        ::teloxide::types::InlineKeyboardMarkup {
            inline_keyboard: vec![
                $(
                    $buttons.into_iter().collect::<Vec<_>>(),
                )*
            ],
        }
    };
}
