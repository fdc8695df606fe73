use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Доступные команды:")]
pub enum Command {
  /// Начать работу или оставить заявку по ссылке
  Start(String),
  /// Показать справку
  Help,
  /// Подать объявление
  Ad,
  /// Мои объявления
  Myads,
  /// Отменить текущее действие
  Cancel,
  /// Выдать доступ сотруднику
  AccessOpen,
  /// Закрыть доступ сотруднику
  AccessClose,
}
