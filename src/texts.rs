//! Тексты сообщений и подписи кнопок (русский UI).

/// Приветствие по /start.
pub const WELCOME: &str = "👋 Привет! Я бот для рассылки сообщений по каналам и группам.\n\n\
Что я умею:\n\
📤 Отправлять сообщение сразу в несколько каналов\n\
⏰ Планировать отправку на нужное время\n\n\
Команды:\n\
/post - отправить сообщение сейчас\n\
/schedule - запланировать отправку\n\
/manage - меню управления\n\
/help - справка\n\n\
Для начала добавьте канал или группу через меню 👇";

/// Справка по /help.
pub const HELP: &str = "ℹ️ Справка:\n\n\
/start - начало работы\n\
/post - отправить сообщение во все ваши каналы\n\
/schedule - запланировать отправку сообщения\n\
/manage - главное меню управления\n\
/help - эта справка\n\n\
Бот должен быть администратором в каждом канале или группе, \
куда вы хотите отправлять сообщения.";

pub const MAIN_MENU: &str = "🛠 Главное меню управления ботом:";

pub const NO_CHANNELS: &str =
    "❌ У вас нет добавленных каналов или групп. Сначала добавьте хотя бы один канал.";

pub const ENTER_MESSAGE: &str = "📝 Введите сообщение для отправки:";

pub const ENTER_SCHEDULE_MESSAGE: &str = "📝 Введите сообщение для запланированной отправки:";

pub const ENTER_SCHEDULE_TIME: &str = "⏰ Введите дату и время отправки:\n\n\
Например: 25.12.2025 15:30\n\n\
Поддерживаемые форматы:\n\
• ДД.ММ.ГГГГ ЧЧ:ММ\n\
• ДД/ММ/ГГГГ ЧЧ:ММ\n\
• ГГГГ-ММ-ДД ЧЧ:ММ";

pub const INVALID_TIME: &str =
    "❌ Не удалось распознать дату и время. Попробуйте ещё раз, например: 25.12.2025 15:30";

pub const TIME_IN_PAST: &str = "❌ Указанное время уже прошло. Введите время в будущем.";

pub const ENTER_CHANNEL_ID: &str = "📢 Отправьте ID канала/группы или @username:\n\n\
Бот должен быть администратором в этом канале.";

pub const MAX_CHANNELS: &str =
    "❌ Достигнут лимит каналов. Удалите один из существующих, чтобы добавить новый.";

pub const CANCELLED: &str = "❌ Операция отменена. Выберите действие:";

pub const NO_SCHEDULED: &str = "📭 У вас нет запланированных постов";

pub const SCHEDULED_LIST: &str = "⏱️ Ваши запланированные посты:";

pub const CHOOSE_CHANNEL_TO_REMOVE: &str = "🗑 Выберите канал/группу для удаления:";

pub const CHANNELS_HEADER: &str = "📋 Ваши каналы и группы:";

pub const CHANNEL_REMOVED: &str = "✅ Канал удалён";

pub const CHANNEL_REMOVE_ERROR: &str = "❌ Ошибка при удалении канала";

pub const POST_NOT_FOUND: &str = "❌ Пост не найден";

pub const SCHEDULED_DELETED: &str = "✅ Запланированный пост удалён";

pub const SCHEDULED_DELETE_ERROR: &str = "❌ Ошибка при удалении поста";

/// Заголовки отчёта о рассылке.
pub const REPORT_HEADER: &str = "📊 Результаты отправки:";
pub const REPORT_HEADER_SCHEDULED: &str = "📊 Результаты отправки запланированного сообщения:";

/// Подписи кнопок.
pub const BTN_POST_NOW: &str = "📤 Отправить сообщение сейчас";
pub const BTN_SCHEDULE: &str = "⏰ Запланировать сообщение";
pub const BTN_ADD_CHANNEL: &str = "➕ Добавить канал/группу";
pub const BTN_LIST_CHANNELS: &str = "📋 Мои каналы и группы";
pub const BTN_SCHEDULED: &str = "⏱️ Запланированные посты";
pub const BTN_REMOVE_CHANNEL: &str = "🗑 Удалить канал/группу";
pub const BTN_BACK: &str = "⬅️ Назад";
pub const BTN_DELETE: &str = "🗑 Удалить";
pub const BTN_CANCEL: &str = "❌ Отмена";

pub fn message_scheduled(time: &str) -> String {
    format!("✅ Сообщение запланировано на {}", time)
}

pub fn channel_added(title: &str) -> String {
    format!("✅ Канал «{}» добавлен", title)
}

pub fn channel_error(error: &str) -> String {
    format!("❌ Не удалось добавить канал: {}", error)
}

pub fn bot_not_admin(title: &str) -> String {
    format!("❌ Бот должен быть администратором в {}", title)
}
