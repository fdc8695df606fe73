use thiserror::Error;

/// Rejected user input. The display text is shown to the user verbatim.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Неверный формат. Пример: 12.5")]
  PlotArea,
  #[error("Неверный формат. Пример: 45.6")]
  Area,
  #[error("Введите целое число.")]
  Integer,
  #[error("Год постройки — четыре цифры.")]
  Year,
  #[error("Цена должна быть минимум пятизначной.")]
  PriceTooShort,
  #[error("Введите цену цифрами.")]
  PriceMissing,
  #[error("«Дополнительно» не должно превышать 100 символов.")]
  ExtraTooLong,
  #[error("Название ЖК пишите латиницей.")]
  ComplexName,
  #[error("Введите целое число для фасада.")]
  PlotLength,
  #[error("Введите целое число для глубины.")]
  PlotWidth,
  #[error("Введите значение текстом.")]
  EmptyText,
  #[error("Можно выбрать не более трёх.")]
  TooManyPurposes,
  #[error("Новая цена должна быть ниже текущей.")]
  PriceNotLower,
  #[error("Новая цена должна быть выше текущей.")]
  PriceNotHigher,
  #[error("Заполните все поля перед публикацией: {}", .0.join(", "))]
  MissingFields(Vec<&'static str>),
}

impl ValidationError {
  pub fn user_message(&self) -> String {
    self.to_string()
  }
}

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("object code {0} is already active")]
  DuplicateCode(String),
  #[error("user {user_id} already has an inquiry for {object_code}")]
  DuplicateInquiry { user_id: i64, object_code: String },
  #[error(transparent)]
  Backend(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum ListingError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("listing {0} not found")]
  NotFound(String),
  #[error("object code {0} is already active")]
  DuplicateCode(String),
  #[error("transport failure: {0:#}")]
  Transport(anyhow::Error),
}

impl From<StoreError> for ListingError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::DuplicateCode(code) => Self::DuplicateCode(code),
      StoreError::Backend(err) => Self::Transport(err.into()),
      err @ StoreError::DuplicateInquiry { .. } => Self::Transport(err.into()),
    }
  }
}

impl ListingError {
  pub fn user_message(&self) -> String {
    match self {
      Self::Validation(err) => err.user_message(),
      Self::NotFound(code) => format!("Объект {code} не найден или уже снят с публикации."),
      Self::DuplicateCode(code) => {
        format!("❗️ Объект {code} уже опубликован.\nПерезапустите /ad, чтобы сгенерировать новый код.")
      },
      Self::Transport(_) => "Не удалось выполнить операцию, попробуйте позже.".to_string(),
    }
  }
}

#[derive(Debug, Error)]
pub enum InquiryError {
  #[error("listing {0} does not accept inquiries")]
  Closed(String),
  #[error("inquiry for listing {0} already submitted")]
  AlreadySubmitted(String),
  #[error("malformed deep link payload")]
  InvalidLink,
  #[error(transparent)]
  Store(#[from] StoreError),
}

impl InquiryError {
  pub fn user_message(&self) -> String {
    match self {
      Self::Closed(_) => "❗️ К сожалению, на этот объект заявки закрыты.".to_string(),
      Self::AlreadySubmitted(_) => "По этому объекту вы уже оставляли заявку.\nВыберите другой объект в канале.".to_string(),
      Self::InvalidLink => "Неверная ссылка.".to_string(),
      Self::Store(_) => "Не удалось сохранить заявку, попробуйте позже.".to_string(),
    }
  }
}
