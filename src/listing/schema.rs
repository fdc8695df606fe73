//! Static per-(property type, deal type) field declarations.

use crate::listing::model::DealType;
use crate::listing::model::Field;
use crate::listing::model::PropertyType;

pub const DISTRICTS: &[&str] = &[
  "Мирабадский",
  "Мирзо-Улугбекский",
  "Юнусабадский",
  "Яшнабадский",
  "Яккасарайский",
  "Сергелийский",
  "Алмазарский",
  "Чиланзарский",
  "Бектемирский",
  "Шайхантаурский",
  "Учтепинский",
  "Ташкентская область",
];

const STATE_OLD: &[&str] = &["Старый ремонт", "Косметический ремонт", "Новый ремонт", "Требует ремонта", "Коробка"];
const STATE_NEW: &[&str] = &[
  "Коробка",
  "Чистовая отделка",
  "Предчистовая отделка",
  "Черновая отделка",
  "Косметический ремонт",
  "Новый ремонт",
  "Требует ремонта",
];
const APARTMENT_MATERIALS: &[&str] = &["Монолит", "Кирпич", "Газоблок", "Панель"];
const HOUSE_MATERIALS: &[&str] = &["Кирпич", "Газоблок", "Керамоблок", "Дерево", "Монолит", "Камень"];
const BATHROOMS: &[&str] = &[
  "1 санузел",
  "2 санузла",
  "3 санузла",
  "4 санузла",
  "5 санузлов",
  "раздельный санузел",
  "совмещенный санузел",
];
const ESTATE_KINDS: &[&str] = &["Дом", "Земельный участок"];
const DRIVE_IN: &[&str] = &["Есть", "Отсутствует"];
const PURPOSES: &[&str] = &[
  "Офис",
  "Торговое помещение",
  "Склад",
  "Производственное помещение",
  "Свободного назначения",
  "Отдельно стоящее здание",
  "Готовый бизнес",
];
const POSITIONS: &[&str] = &["1 - линия", "2 - линия", "БЦ", "в промзоне", "махалля"];
const VAT: &[&str] = &["с учетом НДС", "без учета НДС"];
const OWNERS: &[&str] = &["физ. лицо", "юр. лицо"];

pub const MAX_PURPOSES: usize = 3;

pub type MenuField = (Field, &'static [&'static str]);

#[derive(Debug)]
pub struct FieldSchema {
  pub property_type: PropertyType,
  pub deal: DealType,
  pub menu: &'static [MenuField],
  pub manual: &'static [Field],
  pub required: &'static [Field],
}

impl FieldSchema {
  pub fn choices(&self, field: Field) -> Option<&'static [&'static str]> {
    self.menu.iter().find(|(candidate, _)| *candidate == field).map(|(_, choices)| *choices)
  }

  pub fn is_required(&self, field: Field) -> bool {
    self.required.contains(&field)
  }

  pub fn is_manual(&self, field: Field) -> bool {
    self.manual.contains(&field)
  }

  /// Every field the wizard can touch for this schema.
  pub fn declares(&self, field: Field) -> bool {
    matches!(field, Field::Deal | Field::District) || self.choices(field).is_some() || self.is_manual(field)
  }
}

const APARTMENT_REQUIRED: &[Field] = &[
  Field::Deal,
  Field::District,
  Field::Rooms,
  Field::Floor,
  Field::FloorCount,
  Field::Area,
  Field::Condition,
  Field::Price,
  Field::Landmark,
];

const LAND_REQUIRED: &[Field] = &[
  Field::Deal,
  Field::District,
  Field::EstateKind,
  Field::PlotArea,
  Field::Condition,
  Field::Price,
  Field::Landmark,
];

const COMMERCIAL_MANUAL: &[Field] = &[
  Field::Landmark,
  Field::Floor,
  Field::FloorCount,
  Field::PremisesArea,
  Field::PlotArea,
  Field::Price,
  Field::Extra,
];

static SCHEMAS: &[FieldSchema] = &[
  FieldSchema {
    property_type: PropertyType::OldStock,
    deal: DealType::Sale,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Condition, STATE_OLD),
      (Field::Material, APARTMENT_MATERIALS),
      (Field::Bathrooms, BATHROOMS),
    ],
    manual: &[
      Field::Landmark,
      Field::Rooms,
      Field::Area,
      Field::Floor,
      Field::FloorCount,
      Field::Price,
      Field::Extra,
    ],
    required: APARTMENT_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::OldStock,
    deal: DealType::Rent,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Condition, STATE_OLD),
      (Field::Material, APARTMENT_MATERIALS),
    ],
    manual: &[
      Field::Landmark,
      Field::Rooms,
      Field::Area,
      Field::Floor,
      Field::FloorCount,
      Field::Bathrooms,
      Field::Price,
      Field::Extra,
    ],
    required: APARTMENT_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::NewStock,
    deal: DealType::Sale,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Condition, STATE_NEW),
      (Field::Material, APARTMENT_MATERIALS),
      (Field::Bathrooms, BATHROOMS),
    ],
    manual: &[
      Field::Landmark,
      Field::Complex,
      Field::YearBuilt,
      Field::Rooms,
      Field::Area,
      Field::Floor,
      Field::FloorCount,
      Field::Price,
      Field::Extra,
    ],
    required: APARTMENT_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::NewStock,
    deal: DealType::Rent,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Condition, STATE_NEW),
      (Field::Material, APARTMENT_MATERIALS),
    ],
    manual: &[
      Field::Landmark,
      Field::Complex,
      Field::YearBuilt,
      Field::Rooms,
      Field::Area,
      Field::Floor,
      Field::FloorCount,
      Field::Bathrooms,
      Field::Price,
      Field::Extra,
    ],
    required: APARTMENT_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::Land,
    deal: DealType::Sale,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::EstateKind, ESTATE_KINDS),
      (Field::Material, HOUSE_MATERIALS),
      (Field::Condition, STATE_OLD),
      (Field::DriveIn, DRIVE_IN),
    ],
    manual: &[
      Field::Landmark,
      Field::PlotSize,
      Field::FloorCount,
      Field::PlotArea,
      Field::HouseArea,
      Field::Price,
      Field::Extra,
    ],
    required: LAND_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::Land,
    deal: DealType::Rent,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::EstateKind, ESTATE_KINDS),
      (Field::Material, HOUSE_MATERIALS),
      (Field::Condition, STATE_OLD),
      (Field::DriveIn, DRIVE_IN),
    ],
    manual: &[
      Field::Landmark,
      Field::PlotSize,
      Field::FloorCount,
      Field::PlotArea,
      Field::HouseArea,
      Field::Bathrooms,
      Field::YearBuilt,
      Field::Price,
      Field::Extra,
    ],
    required: LAND_REQUIRED,
  },
  FieldSchema {
    property_type: PropertyType::Commercial,
    deal: DealType::Sale,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Purpose, PURPOSES),
      (Field::Position, POSITIONS),
    ],
    manual: COMMERCIAL_MANUAL,
    required: &[
      Field::Deal,
      Field::District,
      Field::Purpose,
      Field::PremisesArea,
      Field::Price,
      Field::Landmark,
    ],
  },
  FieldSchema {
    property_type: PropertyType::Commercial,
    deal: DealType::Rent,
    menu: &[
      (Field::District, DISTRICTS),
      (Field::Purpose, PURPOSES),
      (Field::Position, POSITIONS),
      (Field::Vat, VAT),
      (Field::Owner, OWNERS),
    ],
    manual: COMMERCIAL_MANUAL,
    required: &[
      Field::Deal,
      Field::District,
      Field::Purpose,
      Field::PremisesArea,
      Field::Price,
      Field::Landmark,
      Field::Owner,
    ],
  },
];

fn find(property_type: PropertyType, deal: DealType) -> Option<&'static FieldSchema> {
  SCHEMAS
    .iter()
    .find(|schema| schema.property_type == property_type && schema.deal == deal)
}

/// Resolves the schema for a listing, never failing.
///
/// Lookup order: the exact pair, then the Sale variant of the same property
/// type, then the Sale variant of the default property type.
pub fn schema(property_type: Option<PropertyType>, deal: Option<DealType>) -> &'static FieldSchema {
  property_type
    .and_then(|kind| deal.and_then(|deal| find(kind, deal)).or_else(|| find(kind, DealType::Sale)))
    .or_else(|| find(PropertyType::default(), DealType::Sale))
    .unwrap_or(&SCHEMAS[0])
}
